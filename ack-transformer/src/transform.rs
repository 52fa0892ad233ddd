mod image;
mod storage_class;
mod volume;

pub use self::image::{IMAGE_FIELD, ImageTransformer};
pub use self::storage_class::{NasDriver, PROVISIONER_KEY, Provisioner, StorageClassTransformer};
pub use self::volume::{PersistentVolumeTransformer, TRANSFORM_TO_KEY, VolumeTarget};

use k8s_openapi::{Metadata, Resource, apimachinery::pkg::apis::meta::v1::ObjectMeta};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Error,
    resource::{self, Object},
};

const NFS_VERSIONS: [&str; 3] = ["3", "4.0", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Rewritten,
}

pub trait Transformer {
    fn transform(&self, object: &mut Object) -> Result<Outcome, Error>;
}

/// A rewrite that works on a typed projection of the object rather than on the generic tree.
pub trait TypedTransformer {
    type Resource: Resource + Metadata<Ty = ObjectMeta> + DeserializeOwned + Serialize;

    /// Returns `Ok(Outcome::Unchanged)` when there is no configuration for the resource.
    fn transform_typed(&self, resource: &mut Self::Resource) -> Result<Outcome, Error>;
}

/// Decodes `object`, runs `transformer` on it and writes the result back.
///
/// `object` is only replaced once the rewrite succeeded, so it is untouched on error.
fn apply_typed<T>(transformer: &T, object: &mut Object) -> Result<Outcome, Error>
where
    T: TypedTransformer,
{
    let mut resource = resource::decode::<T::Resource>(object)?;
    let outcome = transformer.transform_typed(&mut resource)?;
    if outcome == Outcome::Rewritten {
        *object = resource::encode(&resource)?;
    }

    Ok(outcome)
}

fn validate_nfs_version(version: &str) -> Result<(), Error> {
    if NFS_VERSIONS.contains(&version) {
        Ok(())
    } else {
        Err(Error::UnsupportedNfsVersion(version.to_owned()))
    }
}

use std::{collections::BTreeMap, fmt, str::FromStr};

use indexmap::IndexMap;
use k8s_openapi::api::storage::v1::StorageClass;

use crate::{
    Error,
    config::{Attributes, Str},
    resource::{self, Object},
};

use super::{Outcome, Transformer, TypedTransformer};

pub const PROVISIONER_KEY: &str = "alibaba_ACK_provisioner";

const DISK_TYPES: [&str; 4] = ["cloud_ssd", "cloud", "cloud_efficiency", "available"];

// Recycle is not supported by alibabacloud disks.
const RECYCLE: &str = "Recycle";
const RETAIN: &str = "Retain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioner {
    Disk,
    Nas,
}

impl Provisioner {
    pub fn name(self) -> &'static str {
        match self {
            Provisioner::Disk => "alicloud/disk",
            Provisioner::Nas => "alicloud/nas",
        }
    }
}

impl FromStr for Provisioner {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DISK" => Ok(Provisioner::Disk),
            "NAS" => Ok(Provisioner::Nas),
            _ => Err(Error::UnsupportedProvisioner(s.to_owned())),
        }
    }
}

impl fmt::Display for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a NAS StorageClass mounts its volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NasDriver {
    Nfs,
    FlexVolume,
}

impl FromStr for NasDriver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nfs" => Ok(NasDriver::Nfs),
            "flexvolume" => Ok(NasDriver::FlexVolume),
            _ => Err(Error::IllegalDriverType(s.to_owned())),
        }
    }
}

pub struct StorageClassTransformer<'a>(pub &'a IndexMap<Str, Attributes>);

impl TypedTransformer for StorageClassTransformer<'_> {
    type Resource = StorageClass;

    #[tracing::instrument(skip_all, name = "sc_transform", fields(sc = resource::typed_name(&*sc)))]
    fn transform_typed(&self, sc: &mut StorageClass) -> Result<Outcome, Error> {
        let Some(attrs) = self.0.get(resource::typed_name(&*sc)) else {
            tracing::debug!("no storageclass config, leaving StorageClass as is");
            return Ok(Outcome::Unchanged);
        };

        let provisioner = attrs
            .get(PROVISIONER_KEY)
            .ok_or(Error::MissingTag {
                section: "storageclass",
                key: PROVISIONER_KEY,
            })?
            .parse::<Provisioner>()?;

        match provisioner {
            Provisioner::Disk => disk_storage_class(sc, attrs)?,
            Provisioner::Nas => nas_storage_class(sc, attrs)?,
        }

        tracing::debug!(%provisioner, "rewrote provisioner");
        Ok(Outcome::Rewritten)
    }
}

impl Transformer for StorageClassTransformer<'_> {
    fn transform(&self, object: &mut Object) -> Result<Outcome, Error> {
        super::apply_typed(self, object)
    }
}

fn disk_storage_class(sc: &mut StorageClass, attrs: &Attributes) -> Result<(), Error> {
    let ty = attrs.value("type");
    if ty.is_empty() {
        return Err(Error::EmptyFields {
            target: "Disk StorageClass",
            fields: "type",
        });
    }

    if !DISK_TYPES.contains(&ty) {
        return Err(Error::UnsupportedDiskType(ty.to_owned()));
    }

    let mut parameters = BTreeMap::from([("type".to_owned(), ty.to_owned())]);

    let (region, zone) = (attrs.value("region"), attrs.value("zone"));
    if !region.is_empty() && !zone.is_empty() {
        parameters.insert("regionid".to_owned(), region.to_owned());
        parameters.insert("zoneid".to_owned(), zone.to_owned());
    }

    for key in ["fstype", "readonly", "encrypted"] {
        let value = attrs.value(key);
        if !value.is_empty() {
            parameters.insert(key.to_owned(), value.to_owned());
        }
    }

    sc.provisioner = Provisioner::Disk.name().to_owned();
    sc.parameters = Some(parameters);
    // Not validated, mounting the volumes fails if they are invalid.
    sc.mount_options = Some(vec![]);

    if sc.reclaim_policy.as_deref() == Some(RECYCLE) {
        sc.reclaim_policy = Some(RETAIN.to_owned());
    }

    Ok(())
}

fn nas_storage_class(sc: &mut StorageClass, attrs: &Attributes) -> Result<(), Error> {
    let driver = attrs.value("drivertype").parse::<NasDriver>()?;

    match driver {
        NasDriver::Nfs => {
            let mount_options = parse_mount_options(attrs.value("mountOptions"));
            if mount_options.is_empty() {
                return Err(Error::EmptyMountOptions);
            }

            sc.parameters = Some(BTreeMap::new());
            sc.mount_options = Some(mount_options);
        }
        NasDriver::FlexVolume => {
            let version = attrs.value("nfsversion");
            super::validate_nfs_version(version)?;

            let mut parameters = BTreeMap::from([
                ("drivertype".to_owned(), "flexvolume".to_owned()),
                ("options".to_owned(), attrs.value("options").to_owned()),
            ]);
            if !version.is_empty() {
                parameters.insert("nfsversion".to_owned(), version.to_owned());
            }

            sc.parameters = Some(parameters);
            sc.mount_options = Some(vec![]);
        }
    }

    sc.provisioner = Provisioner::Nas.name().to_owned();
    Ok(())
}

/// Splits a comma separated list of mount options, dropping blank entries.
fn parse_mount_options(options: &str) -> Vec<String> {
    options
        .split(',')
        .map(str::trim)
        .filter(|opt| !opt.is_empty())
        .map(str::to_owned)
        .collect()
}

use indexmap::IndexMap;
use serde_json::Value;

use crate::{Error, config::Str, resource::Object, visit};

use super::{Outcome, Transformer};

pub const IMAGE_FIELD: &str = "image";

/// Substitutes image source fragments in every `image` field of an object.
///
/// Each `(old, new)` pair replaces the first occurrence of `old`, in the order the pairs
/// appear in the config. Later pairs see the output of earlier ones.
pub struct ImageTransformer<'a>(pub &'a IndexMap<Str, Str>);

impl ImageTransformer<'_> {
    /// Rewrites a single image reference, returning whether it changed.
    pub fn rewrite(&self, image: &mut Value) -> Result<bool, Error> {
        let Value::String(image) = image else {
            return Err(Error::ImageNotString);
        };

        let mut rewritten = image.clone();
        for (old, new) in self.0 {
            rewritten = rewritten.replacen(old.as_str(), new, 1);
        }

        if rewritten == *image {
            return Ok(false);
        }

        *image = rewritten;
        Ok(true)
    }
}

impl Transformer for ImageTransformer<'_> {
    #[tracing::instrument(skip_all, name = "image_transform", fields(sources = self.0.len()))]
    fn transform(&self, object: &mut Object) -> Result<Outcome, Error> {
        let mut outcome = Outcome::Unchanged;
        visit::operate_fields(object, IMAGE_FIELD, |image| {
            if self.rewrite(image)? {
                tracing::debug!(image = ?image, "rewrote image");
                outcome = Outcome::Rewritten;
            }
            Ok::<_, Error>(())
        })?;

        Ok(outcome)
    }
}

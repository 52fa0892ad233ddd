use std::fmt;

use k8s_openapi::{Metadata, Resource, apimachinery::pkg::apis::meta::v1::ObjectMeta};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::Error;

/// The generic attribute tree of an object as handed over by the restore host.
pub type Object = serde_json::Map<String, Value>;

/// The kinds that get a dedicated rewrite; everything else only has its images substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    PersistentVolume,
    StorageClass,
    Other,
}

impl Kind {
    pub fn of(object: &Object) -> Result<Self, Error> {
        match object.get("kind").and_then(Value::as_str) {
            Some("PersistentVolume") => Ok(Kind::PersistentVolume),
            Some("StorageClass") => Ok(Kind::StorageClass),
            Some(_) => Ok(Kind::Other),
            None => Err(Error::KindField),
        }
    }

    pub fn is_typed(self) -> bool {
        !matches!(self, Kind::Other)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::PersistentVolume => write!(f, "PersistentVolume"),
            Kind::StorageClass => write!(f, "StorageClass"),
            Kind::Other => write!(f, "object"),
        }
    }
}

/// `metadata.name` of a generic object, if it is a string.
pub fn name(object: &Object) -> Option<&str> {
    object.get("metadata")?.get("name")?.as_str()
}

/// `metadata.name` of a typed object. A missing name is treated as the empty name.
pub fn typed_name<K>(resource: &K) -> &str
where
    K: Metadata<Ty = ObjectMeta>,
{
    resource.metadata().name.as_deref().unwrap_or_default()
}

/// Decodes a copy of `object` into its typed form, leaving `object` untouched.
pub fn decode<K>(object: &Object) -> Result<K, Error>
where
    K: Resource + DeserializeOwned,
{
    serde_json::from_value(Value::Object(object.clone())).map_err(|source| Error::Decode {
        kind: K::KIND,
        source,
    })
}

pub fn encode<K>(resource: &K) -> Result<Object, Error>
where
    K: Resource + Serialize,
{
    let encode_err = |source: serde_json::Error| Error::Encode {
        kind: K::KIND,
        source,
    };

    match serde_json::to_value(resource).map_err(encode_err)? {
        Value::Object(object) => Ok(object),
        _ => Err(encode_err(serde::ser::Error::custom(
            "resource did not encode to a mapping",
        ))),
    }
}

#[cfg(test)]
pub(crate) fn object(value: Value) -> Object {
    match value {
        Value::Object(object) => object,
        value => panic!("expected an object, found `{value}`"),
    }
}

use std::{
    fmt,
    fs::File,
    io::{self, Read as _},
    ops::Deref,
    path::{Path, PathBuf},
};

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub type Str = CompactString;

pub const DEFAULT_CONFIG_PATH: &str = "/transformConf/transform-config.json";

/// The transformation configuration. Every mapping keeps the order of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Old image source fragment to its replacement.
    #[serde(
        rename = "ImageSources",
        default,
        deserialize_with = "crate::serde_ex::nullable::deserialize"
    )]
    pub image_sources: IndexMap<Str, Str>,
    /// PersistentVolume name to the attributes describing its rewrite.
    #[serde(
        rename = "PersistentVolume",
        default,
        deserialize_with = "crate::serde_ex::nullable::deserialize"
    )]
    pub persistent_volumes: IndexMap<Str, Attributes>,
    /// StorageClass name to the attributes describing its rewrite.
    #[serde(
        rename = "StorageClass",
        default,
        deserialize_with = "crate::serde_ex::nullable::deserialize"
    )]
    pub storage_classes: IndexMap<Str, Attributes>,
}

impl TransformConfig {
    pub fn is_empty(&self) -> bool {
        self.image_sources.is_empty()
            && self.persistent_volumes.is_empty()
            && self.storage_classes.is_empty()
    }
}

impl fmt::Display for TransformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} image sources, {} persistent volumes, {} storage classes",
            self.image_sources.len(),
            self.persistent_volumes.len(),
            self.storage_classes.len()
        )
    }
}

/// A string to string bag of settings for a single named resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(IndexMap<Str, Str>);

impl Attributes {
    /// The value of `key`, or the empty string if it is not set.
    pub fn value(&self, key: &str) -> &str {
        self.0.get(key).map_or("", Str::as_str)
    }

    /// Like [`Attributes::value`] but distinguishes a missing key from an empty value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(Str::as_str)
    }
}

impl Deref for Attributes {
    type Target = IndexMap<Str, Str>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads the [`TransformConfig`] from a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `Ok(None)` if there is no file at the configured path.
    pub fn load(&self) -> Result<Option<TransformConfig>, ConfigError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Open {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mut data = String::new();
        file.read_to_string(&mut data)
            .map_err(|source| ConfigError::Read {
                path: self.path.clone(),
                source,
            })?;

        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Replaces `config` with the file contents. `config` is left as is when the file is
    /// absent or cannot be loaded.
    pub fn reload(&self, config: &mut TransformConfig) -> Result<(), ConfigError> {
        if let Some(loaded) = self.load()? {
            *config = loaded;
        }

        Ok(())
    }
}

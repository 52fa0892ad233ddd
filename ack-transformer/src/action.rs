use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    config::{ConfigLoader, Str, TransformConfig},
    resource::{self, Kind, Object},
    transform::{
        ImageTransformer, Outcome, PersistentVolumeTransformer, StorageClassTransformer,
        Transformer,
    },
};

/// Which objects a restore item action wants to see. The default selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_namespaces: Vec<Str>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_namespaces: Vec<Str>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_resources: Vec<Str>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_resources: Vec<Str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<Str>,
}

impl ResourceSelector {
    pub fn is_universal(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteInput {
    /// The object about to be restored.
    pub item: Object,
    /// The object as it was stored in the backup. Not read by the transformer.
    pub item_from_backup: Option<Object>,
}

impl ExecuteInput {
    pub fn new(item: Object) -> Self {
        Self {
            item,
            item_from_backup: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteOutput {
    pub item: Object,
    pub additional_items: Vec<Object>,
    pub skip_restore: bool,
}

impl ExecuteOutput {
    pub fn new(item: Object) -> Self {
        Self {
            item,
            additional_items: vec![],
            skip_restore: false,
        }
    }
}

/// A failed execution. The host should still restore [`ExecuteError::output`].
///
/// Displays as the underlying [`Error`] and shares its source chain.
#[derive(Debug)]
pub struct ExecuteError {
    output: ExecuteOutput,
    error: Error,
}

impl fmt::Display for ExecuteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for ExecuteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

impl ExecuteError {
    pub fn new(output: ExecuteOutput, error: Error) -> Self {
        Self { output, error }
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    pub fn output(&self) -> &ExecuteOutput {
        &self.output
    }

    pub fn into_output(self) -> ExecuteOutput {
        self.output
    }

    pub fn into_parts(self) -> (ExecuteOutput, Error) {
        (self.output, self.error)
    }
}

/// The contract between the restore host and a plugin that rewrites objects before they are
/// restored. The host calls [`RestoreItemAction::execute`] once per selected object.
pub trait RestoreItemAction {
    fn applies_to(&mut self) -> ResourceSelector;

    fn execute(&mut self, input: ExecuteInput) -> Result<ExecuteOutput, ExecuteError>;
}

/// Rewrites objects so they can be restored into an Alibaba Cloud ACK cluster.
///
/// Methods take `&mut self` because the config is reloaded on every call. Hosts that execute
/// concurrently must serialize access, e.g. with a `Mutex`.
#[derive(Debug, Default)]
pub struct ObjectRestoreTransformer {
    loader: ConfigLoader,
    config: TransformConfig,
}

impl ObjectRestoreTransformer {
    pub fn new(loader: ConfigLoader) -> Self {
        let mut this = Self {
            loader,
            config: TransformConfig::default(),
        };
        this.reload_config();
        this
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Reloads the config file. Errors are logged and the previous config is kept.
    pub fn reload_config(&mut self) {
        if let Err(err) = self.loader.reload(&mut self.config) {
            tracing::error!(
                error = &err as &dyn std::error::Error,
                path = %self.loader.path().display(),
                "config load error"
            );
        }
    }

    /// Transforms `object` in place using the current config.
    pub fn transform(&self, object: &mut Object) -> Result<(Kind, Outcome), Error> {
        let kind = Kind::of(object)?;
        Ok((kind, self.transform_as(kind, object)?))
    }

    fn transform_as(&self, kind: Kind, object: &mut Object) -> Result<Outcome, Error> {
        match kind {
            Kind::PersistentVolume => {
                PersistentVolumeTransformer(&self.config.persistent_volumes).transform(object)
            }
            Kind::StorageClass => {
                StorageClassTransformer(&self.config.storage_classes).transform(object)
            }
            Kind::Other => ImageTransformer(&self.config.image_sources).transform(object),
        }
    }
}

impl RestoreItemAction for ObjectRestoreTransformer {
    fn applies_to(&mut self) -> ResourceSelector {
        self.reload_config();
        ResourceSelector::default()
    }

    #[tracing::instrument(skip_all, fields(name = resource::name(&input.item)))]
    fn execute(&mut self, input: ExecuteInput) -> Result<ExecuteOutput, ExecuteError> {
        self.reload_config();

        let mut item = input.item;
        let kind = match Kind::of(&item) {
            Ok(kind) => kind,
            Err(error) => {
                tracing::warn!(%error, "cannot determine kind");
                return Err(ExecuteError::new(ExecuteOutput::new(item), error));
            }
        };

        match self.transform_as(kind, &mut item) {
            Ok(Outcome::Rewritten) if kind.is_typed() => {
                let name = resource::name(&item).unwrap_or_default();
                tracing::info!("{kind} {name} is transformed");
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(
                    %kind,
                    error = &error as &dyn std::error::Error,
                    "transform error"
                );
                return Err(ExecuteError::new(ExecuteOutput::new(item), error));
            }
        }

        Ok(ExecuteOutput::new(item))
    }
}

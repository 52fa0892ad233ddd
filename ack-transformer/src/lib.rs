pub mod action;
pub mod config;
mod error;
pub mod logging;
pub mod resource;
mod serde_ex;
pub mod transform;
pub mod visit;
pub mod yaml;

use std::path::Path;

use anyhow::Context;

pub use self::action::{
    ExecuteError, ExecuteInput, ExecuteOutput, ObjectRestoreTransformer, ResourceSelector,
    RestoreItemAction,
};
pub use self::config::{ConfigLoader, DEFAULT_CONFIG_PATH, TransformConfig};
pub use self::error::Error;
pub use self::resource::Object;

/// Loads every object in a YAML or JSON file.
pub fn load_objects(path: impl AsRef<Path>) -> anyhow::Result<Vec<Object>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading objects from {}", path.display()))?;
    yaml::from_documents(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Runs every object through `action` the way a restore host would, handing back the items to
/// restore. Failed items are logged and restored as returned by the action.
pub fn restore_all(
    action: &mut impl RestoreItemAction,
    objects: impl IntoIterator<Item = Object>,
) -> Vec<Object> {
    let selector = action.applies_to();
    tracing::debug!(?selector, "resource selector");

    objects
        .into_iter()
        .map(|item| match action.execute(ExecuteInput::new(item)) {
            Ok(output) => output.item,
            Err(err) => {
                tracing::warn!(
                    error = err.error() as &dyn std::error::Error,
                    "restoring item with warning"
                );
                err.into_output().item
            }
        })
        .collect()
}

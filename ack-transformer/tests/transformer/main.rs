use std::path::Path;

use ack_transformer::{
    ConfigLoader, ExecuteInput, ObjectRestoreTransformer, RestoreItemAction, yaml,
};
use anyhow::Context;

datatest_stable::harness! {
    { test = test, root = "tests/transformer/testdata", pattern = r".*/input\.yaml$" },
}

// Each case directory holds `input.yaml`, an optional `config.json`, the item handed back to the
// host in `expected.yaml` and, if the action reports an error, its message in `expected.stderr`.
// An error is only snapshotted into a new `expected.stderr` when `UPDATE_SNAPSHOTS` is set.
fn test(path: &Path) -> datatest_stable::Result<()> {
    let dir = path.parent().unwrap();
    let mut transformer = ObjectRestoreTransformer::new(ConfigLoader::new(dir.join("config.json")));

    let [item] = <[_; 1]>::try_from(ack_transformer::load_objects(path)?)
        .map_err(|objects| format!("expected a single object, found {}", objects.len()))?;

    let (output, error) = match transformer.execute(ExecuteInput::new(item)) {
        Ok(output) => (output, None),
        Err(err) => {
            let (output, error) = err.into_parts();
            (output, Some(error))
        }
    };

    assert!(output.additional_items.is_empty());
    assert!(!output.skip_restore);

    let stderr_path = dir.join("expected.stderr");
    match error {
        Some(error) if !stderr_path.exists() && !updating_snapshots() => {
            return Err(format!("unexpected error for {}: {error}", path.display()).into());
        }
        Some(error) => snapshot(&stderr_path, &format!("{error}\n"))?,
        None if stderr_path.exists() => {
            return Err(format!("expected an error for {}", path.display()).into());
        }
        None => {}
    }

    snapshot_yaml(&dir.join("expected.yaml"), &yaml::to_string(&output.item)?)
}

fn updating_snapshots() -> bool {
    std::env::var("UPDATE_SNAPSHOTS").is_ok()
}

fn snapshot(path: &Path, actual: &str) -> datatest_stable::Result<()> {
    if !path.exists() || updating_snapshots() {
        std::fs::write(path, actual).context("writing snapshot")?;
        return Ok(());
    }

    let expected = std::fs::read_to_string(path).context("reading snapshot")?;
    if expected == actual {
        return Ok(());
    }

    mismatch(path, &expected, actual)
}

// Field order is not significant, so YAML snapshots are compared as values.
fn snapshot_yaml(path: &Path, actual: &str) -> datatest_stable::Result<()> {
    if !path.exists() || updating_snapshots() {
        return snapshot(path, actual);
    }

    let expected = std::fs::read_to_string(path).context("reading snapshot")?;
    let expected_value: serde_json::Value = serde_yaml::from_str(&expected)?;
    let actual_value: serde_json::Value = serde_yaml::from_str(actual)?;
    if expected_value == actual_value {
        return Ok(());
    }

    let expected = serde_yaml::to_string(&expected_value)?;
    mismatch(path, &expected, actual)
}

fn mismatch(path: &Path, expected: &str, actual: &str) -> datatest_stable::Result<()> {
    let chunks = dissimilar::diff(expected, actual);
    eprintln!("Snapshot mismatch for {}:\n{}", path.display(), format_chunks(chunks));

    Err(format!("Snapshot mismatch for {}", path.display()).into())
}

fn format_chunks(chunks: Vec<dissimilar::Chunk>) -> String {
    let mut buf = String::new();
    for chunk in chunks {
        let formatted = match chunk {
            dissimilar::Chunk::Equal(text) => text.into(),
            dissimilar::Chunk::Delete(text) => format!("\x1b[4m\x1b[31m{}\x1b[0m", text),
            dissimilar::Chunk::Insert(text) => format!("\x1b[4m\x1b[32m{}\x1b[0m", text),
        };
        buf.push_str(&formatted);
    }
    buf
}

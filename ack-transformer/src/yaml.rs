use std::io::Write;

use anyhow::bail;
use serde::Deserialize;
use serde_json::Value;

use crate::resource::Object;

/// Parses a stream of YAML documents (JSON being a subset), skipping empty ones.
pub fn from_documents(s: &str) -> anyhow::Result<Vec<Object>> {
    let mut objects = vec![];
    for document in serde_yaml::Deserializer::from_str(s) {
        match Value::deserialize(document)? {
            Value::Null => continue,
            Value::Object(object) => objects.push(object),
            other => bail!("expected a mapping document but found `{other}`"),
        }
    }

    Ok(objects)
}

pub fn to_writer<'a>(
    out: &mut dyn Write,
    objects: impl IntoIterator<Item = &'a Object>,
) -> anyhow::Result<()> {
    for (i, object) in objects.into_iter().enumerate() {
        if i > 0 {
            writeln!(out, "---")?;
        }
        serde_yaml::to_writer(&mut *out, object)?;
    }

    Ok(())
}

pub fn to_string(object: &Object) -> anyhow::Result<String> {
    serde_yaml::to_string(object).map_err(Into::into)
}

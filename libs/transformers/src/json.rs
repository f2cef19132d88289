//! Flattening transform for generic JSON payloads.
//!
//! Writers store payload objects flattened, nested keys joined with
//! `/` (`{"a": {"b": 1}}` → `{"a/b": 1}`). The read path runs the
//! stored object through [`parse_flat`] to reconstruct the nesting
//! API consumers expect.

use serde_json::{Map, Value};

const SEP: char = '/';

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Object keys must not contain the separator, it would be
    /// indistinguishable from nesting after flattening.
    #[error("invalid object key '{0}'")]
    InvalidKey(String),
}

/// Flatten a nested JSON object into a single-level map with
/// `/`-joined keys. Non-object leaves are copied as-is; nested empty
/// objects vanish.
pub fn flatten(input: &Map<String, Value>) -> Result<Map<String, Value>, TransformError> {
    let mut out = Map::new();
    flatten_into("", input, &mut out)?;
    Ok(out)
}

fn flatten_into(
    prefix: &str,
    input: &Map<String, Value>,
    out: &mut Map<String, Value>,
) -> Result<(), TransformError> {
    for (key, val) in input {
        if key.contains(SEP) {
            return Err(TransformError::InvalidKey(key.clone()));
        }
        let flat_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{SEP}{key}")
        };
        match val {
            Value::Object(nested) => flatten_into(&flat_key, nested, out)?,
            other => {
                out.insert(flat_key, other.clone());
            }
        }
    }
    Ok(())
}

/// Inverse of [`flatten`]: rebuild nesting from `/`-joined keys.
/// Values that are not objects pass through unchanged. A scalar
/// sitting on an intermediate path segment is displaced by the
/// deeper keys.
pub fn parse_flat(flat: &Value) -> Value {
    match flat {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, val) in map {
                let segs: Vec<&str> = key.split(SEP).collect();
                insert_path(&mut out, &segs, val);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn insert_path(target: &mut Map<String, Value>, segs: &[&str], val: &Value) {
    match segs {
        [] => {}
        [last] => {
            target.insert((*last).to_string(), val.clone());
        }
        [head, rest @ ..] => {
            let entry = target
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(next) = entry {
                insert_path(next, rest, val);
            }
        }
    }
}

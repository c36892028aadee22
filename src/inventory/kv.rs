//! Parsing of values stored under the `kv_groups` and `kv_metadata` paths.

use serde_json::{Map, Value};
use thiserror::Error;

/// Why a `kv_metadata` value could not be used.
#[derive(Error, Debug)]
pub enum MetadataParseError {
    #[error("value is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Build the KV key for a node: `<path>/<datacenter>/<node>`.
pub fn node_key(path: &str, datacenter: &str, node_name: &str) -> String {
    format!("{}/{}/{}", path.trim_end_matches('/'), datacenter, node_name)
}

/// Split a comma separated group list, trimming whitespace and dropping
/// empty entries.
pub fn parse_group_list(raw: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(raw)
        .split(',')
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .map(String::from)
        .collect()
}

/// Decode a JSON object of host variables.
pub fn parse_metadata(raw: &[u8]) -> Result<Map<String, Value>, MetadataParseError> {
    match serde_json::from_slice::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(MetadataParseError::NotAnObject(json_type_name(&other))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Wire payload serialization.

use serde_json::{Map, Value};

use crate::fields::RecordField;

/// Serialize the configured origin fields of a normalized record into a
/// UTF-8 JSON object. Fields the record does not carry serialize as `null`.
pub(crate) fn encode(
    normalized: &Map<String, Value>,
    fields: &[RecordField],
) -> Result<Vec<u8>, serde_json::Error> {
    let mut body = Map::with_capacity(fields.len());
    for field in fields {
        let value = normalized.get(field.as_str()).cloned().unwrap_or(Value::Null);
        body.insert(field.as_str().to_owned(), value);
    }
    serde_json::to_vec(&Value::Object(body))
}

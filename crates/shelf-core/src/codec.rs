//! Document codec.
//!
//! Collections are stored as bare, pretty-printed JSON arrays so that every
//! write produces a readable diff in the backing repository. File content
//! travels to and from the remote store as base64 of its UTF-8 bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashSet;
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::Document;

/// Body written for a freshly provisioned, empty collection.
pub const EMPTY_DOCUMENT: &str = "[]\n";

/// Serialize a collection deterministically (struct field order, sorted tags,
/// two-space indent, trailing newline).
pub fn encode<T: Document>(items: &[T]) -> Result<String> {
    let mut out = serde_json::to_string_pretty(items)?;
    out.push('\n');
    Ok(out)
}

/// Parse and validate a collection.
///
/// Malformed JSON, a non-array top level, items of the wrong shape and empty
/// identifiers are all reported as [`Error::CorruptDocument`]. Duplicate
/// identifiers keep their first occurrence.
pub fn decode<T: Document>(raw: &[u8]) -> Result<Vec<T>> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let value: serde_json::Value = serde_json::from_slice(raw).map_err(|e| {
        Error::CorruptDocument(format!("{}: invalid JSON: {}", T::KIND.path(), e))
    })?;

    let array = match value {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(Error::CorruptDocument(format!(
                "{}: expected array, found {}",
                T::KIND.path(),
                json_type_name(&other)
            )))
        }
    };

    let mut seen = HashSet::with_capacity(array.len());
    let mut items = Vec::with_capacity(array.len());
    for (index, entry) in array.into_iter().enumerate() {
        let item: T = serde_json::from_value(entry).map_err(|e| {
            Error::CorruptDocument(format!("{}[{}]: {}", T::KIND.path(), index, e))
        })?;
        if item.id().trim().is_empty() {
            return Err(Error::CorruptDocument(format!(
                "{}[{}]: empty id",
                T::KIND.path(),
                index
            )));
        }
        if !seen.insert(item.id().to_string()) {
            warn!(
                component = "codec",
                kind = %T::KIND,
                id = item.id(),
                "Dropping duplicate item"
            );
            continue;
        }
        items.push(item);
    }
    Ok(items)
}

/// Encode text for transport: base64 of the UTF-8 bytes.
pub fn encode_transport(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode a transport payload back into text.
///
/// Line breaks and other whitespace inserted by the host are ignored.
pub fn decode_transport(payload: &str) -> Result<String> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::CorruptDocument(format!("invalid base64 payload: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::CorruptDocument(format!("payload is not UTF-8: {}", e)))
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

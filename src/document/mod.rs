// Input documents
//
// The subject document is any JSON value; reference data is an optional
// typed bundle of substitution lists. Both are validated here, before the
// pipeline starts.

pub mod reference;

pub use reference::{AddressLists, NameLists, ReferenceData};

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{PipelineError, Result};

/// Parse JSON text with no nesting limit
///
/// serde_json stops at 128 levels by default; documents and model replies
/// may nest deeper, so the limit is lifted and the stack grows on demand.
pub fn parse_json(text: &str) -> serde_json::Result<Value> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(value)
}

/// Parse the subject document from JSON text
pub fn parse_document(text: &str) -> Result<Value> {
    parse_json(text).map_err(|e| {
        PipelineError::validation(format!(
            "Invalid JSON file. Please upload a valid JSON file. ({})",
            e
        ))
    })
}

/// Serialize a document the way it is embedded in prompts and written to disk
pub fn to_pretty_json(value: &Value) -> String {
    // Value serialization cannot fail: keys are always strings
    serde_json::to_string_pretty(value).unwrap_or_default()
}

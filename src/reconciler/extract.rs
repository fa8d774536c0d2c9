// JSON extraction from raw completion text
//
// Models are told not to use markdown, but often wrap the answer in a
// ``` fence anyway. Strip the fence, then parse strictly.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::document::parse_json;
use crate::errors::{PipelineError, Result};

// Opening fence plus its language tag. A tag starts with a letter and is
// followed by whitespace; anything else on the fence line is content.
static OPENING_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^```(?:[A-Za-z][A-Za-z0-9_+-]*(?:[ \t]*\r?\n|[ \t]+)|[ \t]*\r?\n)?")
        .expect("valid fence regex")
});

const FENCE: &str = "```";

/// Remove a surrounding markdown code fence, if the text starts with one
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with(FENCE) {
        return trimmed;
    }

    let body = match OPENING_FENCE.find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        None => &trimmed[FENCE.len()..],
    };
    let body = body.trim_end();
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}

/// Recover a JSON value from completion text
pub fn extract_json(raw: &str) -> Result<Value> {
    let candidate = strip_code_fence(raw);

    parse_json(candidate).map_err(|source| {
        tracing::debug!("Completion text is not valid JSON: {}", source);
        PipelineError::Parse {
            raw: raw.to_string(),
            source,
        }
    })
}

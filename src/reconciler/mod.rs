// Response reconciler
//
// Turns raw completion text back into a JSON document and reports which
// leaves the model changed.

pub mod diff;
pub mod extract;

pub use diff::{diff, ChangeRecord, ROOT_PATH};
pub use extract::{extract_json, strip_code_fence};

use serde_json::Value;

use crate::errors::Result;

/// Extract the candidate document and diff it against the original
pub fn reconcile(original: &Value, raw_completion: &str) -> Result<(Value, Vec<ChangeRecord>)> {
    let candidate = extract_json(raw_completion)?;
    let changes = diff(original, &candidate);
    Ok((candidate, changes))
}

// Change list rendering

use crossterm::style::Stylize;
use serde_json::Value;

use crate::reconciler::ChangeRecord;

/// Strings print bare; everything else prints as compact JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Human-readable comparison, one block per changed field
pub fn format_changes(changes: &[ChangeRecord], colored: bool) -> String {
    if changes.is_empty() {
        return "No changes detected.\n".to_string();
    }

    let mut output = format!("{} field(s) changed:\n", changes.len());
    for change in changes {
        let original = display_value(&change.original);
        let candidate = display_value(&change.candidate);

        output.push('\n');
        if colored {
            output.push_str(&format!("{}\n", change.path.as_str().bold()));
            output.push_str(&format!("  Original:      {}\n", original.red()));
            output.push_str(&format!("  Pseudonymized: {}\n", candidate.green()));
        } else {
            output.push_str(&format!("{}\n", change.path));
            output.push_str(&format!("  Original:      {}\n", original));
            output.push_str(&format!("  Pseudonymized: {}\n", candidate));
        }
    }
    output
}

/// Machine-readable change list
pub fn changes_to_json(changes: &[ChangeRecord]) -> String {
    serde_json::to_string_pretty(changes).unwrap_or_else(|_| "[]".to_string())
}

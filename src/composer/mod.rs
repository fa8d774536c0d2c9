// Request composer
//
// Merges the subject document, the editable instruction template and the
// optional reference data into the single prompt sent to the model.

use serde_json::Value;

use crate::config::constants::DATA_MARKER;
use crate::document::{to_pretty_json, ReferenceData};

/// Built-in instruction template used when none is configured
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Pseudonymize the following JSON data. \
Replace all personal information (names, email addresses, phone numbers, \
street addresses, dates of birth, identification numbers) with realistic \
but fictitious values. Keep the exact same JSON structure, keys and data \
types. Keep non-personal values unchanged. Return only the JSON.\n\n{DATA}";

/// Suffix appended to the template when reference data is supplied
fn reference_instructions(reference: &ReferenceData) -> String {
    format!(
        "\n\nIMPORTANT: Use the following custom data for pseudonymization:\n{}\n\n\
         When replacing names, use names from the provided firstNames and lastNames lists. \
         When replacing addresses, use addresses from the provided streets, cities, buildings, \
         and apartments lists. Randomly combine these elements to create realistic addresses.",
        reference.to_pretty_json()
    )
}

/// Whether the template carries the document marker at all
pub fn has_data_marker(template: &str) -> bool {
    template.contains(DATA_MARKER)
}

/// Build the prompt for one pseudonymization request.
///
/// Only the first `{DATA}` marker is replaced. A template without the
/// marker comes back unchanged (plus the reference suffix).
pub fn compose(document: &Value, template: &str, reference: Option<&ReferenceData>) -> String {
    let data = to_pretty_json(document);

    let mut template = template.trim().to_string();
    if let Some(reference) = reference {
        template.push_str(&reference_instructions(reference));
    }

    template.replacen(DATA_MARKER, &data, 1)
}

// Reference substitution data
//
// Optional user-supplied lists the completion service is told to draw
// replacement names and address components from.
//
// ```json
// {
//   "names": { "firstNames": ["Ada"], "lastNames": ["Byron"] },
//   "addresses": { "streets": ["Elm St"], "cities": ["Springfield"] }
// }
// ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::parse_json;
use crate::errors::{PipelineError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameLists {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub first_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub last_names: Vec<String>,
}

impl NameLists {
    pub fn is_empty(&self) -> bool {
        self.first_names.is_empty() && self.last_names.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressLists {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub streets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buildings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apartments: Vec<String>,
}

impl AddressLists {
    pub fn is_empty(&self) -> bool {
        self.streets.is_empty()
            && self.cities.is_empty()
            && self.buildings.is_empty()
            && self.apartments.is_empty()
    }
}

/// Validated reference data. Construct through `from_json` / `from_value`
/// so the at-least-one-category invariant always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    pub names: Option<NameLists>,
    pub addresses: Option<AddressLists>,
    // Supplied object minus empty categories; this is what the model sees
    raw: Map<String, Value>,
}

#[derive(Deserialize)]
struct Categories {
    #[serde(default)]
    names: Option<NameLists>,
    #[serde(default)]
    addresses: Option<AddressLists>,
}

impl ReferenceData {
    /// Parse and validate reference data from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let value = parse_json(text).map_err(|e| invalid(&format!("malformed JSON ({})", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut raw) = value else {
            return Err(invalid("Custom data must be a JSON object"));
        };

        let Categories {
            mut names,
            mut addresses,
        } = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| invalid(&e.to_string()))?;

        // Empty categories carry nothing for the prompt
        if names.as_ref().is_some_and(NameLists::is_empty) {
            names = None;
        }
        if addresses.as_ref().is_some_and(AddressLists::is_empty) {
            addresses = None;
        }

        if names.is_none() && addresses.is_none() {
            return Err(invalid(
                "Custom data must contain at least names or addresses",
            ));
        }

        raw.retain(|key, _| match key.as_str() {
            "names" => names.is_some(),
            "addresses" => addresses.is_some(),
            _ => true,
        });

        Ok(Self {
            names,
            addresses,
            raw,
        })
    }

    /// Reference data as embedded in the prompt, unknown fields included
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_default()
    }
}

fn invalid(reason: &str) -> PipelineError {
    PipelineError::validation(format!(
        "Invalid custom data JSON file: {}. Please check the file format.",
        reason
    ))
}

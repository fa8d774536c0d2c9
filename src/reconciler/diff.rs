// Structural diff between the original and the pseudonymized document
//
// Only value substitutions at matching positions are reported. Keys that
// exist on one side only and array positions past the shorter length are
// skipped, so insertions and deletions never show up as changes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Path reported when the documents differ at the top level
pub const ROOT_PATH: &str = "root";

/// One divergent leaf between the two documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub path: String,
    pub original: Value,
    pub candidate: Value,
}

impl ChangeRecord {
    fn new(path: &str, original: &Value, candidate: &Value) -> Self {
        Self {
            path: if path.is_empty() {
                ROOT_PATH.to_string()
            } else {
                path.to_string()
            },
            original: original.clone(),
            candidate: candidate.clone(),
        }
    }
}

/// Compute the change list, in array-index / first-seen-key order
pub fn diff(original: &Value, candidate: &Value) -> Vec<ChangeRecord> {
    let mut changes = Vec::new();
    let mut path = String::new();
    diff_into(original, candidate, &mut path, &mut changes);
    changes
}

// `path` is shared across the walk; each level truncates back to its
// own prefix before returning
fn diff_into(original: &Value, candidate: &Value, path: &mut String, out: &mut Vec<ChangeRecord>) {
    match (original, candidate) {
        (Value::Array(left), Value::Array(right)) => {
            for (index, (l, r)) in left.iter().zip(right.iter()).enumerate() {
                let len = path.len();
                path.push('[');
                path.push_str(&index.to_string());
                path.push(']');
                diff_into(l, r, path, out);
                path.truncate(len);
            }
        }
        (Value::Object(left), Value::Object(right)) => {
            for key in union_keys(left, right) {
                let (Some(l), Some(r)) = (left.get(key), right.get(key)) else {
                    continue;
                };
                let len = path.len();
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(key);
                diff_into(l, r, path, out);
                path.truncate(len);
            }
        }
        _ => {
            if !values_equal(original, candidate) {
                out.push(ChangeRecord::new(path, original, candidate));
            }
        }
    }
}

/// Keys of both maps, original's first, each once
fn union_keys<'a>(left: &'a Map<String, Value>, right: &'a Map<String, Value>) -> Vec<&'a str> {
    let mut keys: Vec<&str> = left.keys().map(String::as_str).collect();
    keys.extend(
        right
            .keys()
            .map(String::as_str)
            .filter(|key| !left.contains_key(*key)),
    );
    keys
}

/// Deep equality; numbers compare by value so `1` and `1.0` match
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

//! Lenient decoding of faculty output.
//!
//! Model output is never rejected field by field: a missing or mistyped
//! field takes its default, and numeric fields are clamped into range.
//!
//! | field | default | range |
//! |-------|---------|-------|
//! | `response` | `""` | - |
//! | `confidence` | 0.5 | [0, 1] |
//! | `valence` | 0.0 | [-1, 1] |
//! | `reasoning_chain` | `[]` | - |
//! | `activated_habits` | `[]` | - |

use serde_json::{Map, Value};

use super::{ActivatedHabit, BuddhiOutput, Faculty, FacultyOutput, ManasOutput, SanskarasOutput};

pub const DEFAULT_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_VALENCE: f64 = 0.0;

fn text(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn clamped(map: &Map<String, Value>, key: &str, default: f64, min: f64, max: f64) -> f64 {
    map.get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(default)
        .clamp(min, max)
}

/// Confidence in [0, 1].
pub fn confidence(map: &Map<String, Value>) -> f64 {
    clamped(map, "confidence", DEFAULT_CONFIDENCE, 0.0, 1.0)
}

/// Valence in [-1, 1].
pub fn valence(map: &Map<String, Value>) -> f64 {
    clamped(map, "valence", DEFAULT_VALENCE, -1.0, 1.0)
}

fn reasoning_chain(map: &Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(steps)) = map.get("reasoning_chain") else {
        return Vec::new();
    };
    steps
        .iter()
        .map(|step| match step {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

fn activated_habits(map: &Map<String, Value>) -> Vec<ActivatedHabit> {
    let Some(Value::Array(items)) = map.get("activated_habits") else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(ActivatedHabit::named(name.clone())),
            Value::Object(obj) => {
                let mut details = obj.clone();
                let name = match details.remove("name") {
                    Some(Value::String(name)) => name,
                    _ => String::new(),
                };
                Some(ActivatedHabit { name, details })
            }
            _ => None,
        })
        .collect()
}

impl ManasOutput {
    pub fn decode(map: &Map<String, Value>) -> Self {
        Self {
            response: text(map, "response"),
            confidence: confidence(map),
            valence: valence(map),
        }
    }
}

impl BuddhiOutput {
    pub fn decode(map: &Map<String, Value>) -> Self {
        Self {
            response: text(map, "response"),
            confidence: confidence(map),
            reasoning_chain: reasoning_chain(map),
        }
    }
}

impl SanskarasOutput {
    pub fn decode(map: &Map<String, Value>) -> Self {
        Self {
            response: text(map, "response"),
            confidence: confidence(map),
            activated_habits: activated_habits(map),
        }
    }
}

/// Decodes one faculty's object.
pub fn decode(faculty: Faculty, map: &Map<String, Value>) -> FacultyOutput {
    match faculty {
        Faculty::Manas => FacultyOutput::Manas(ManasOutput::decode(map)),
        Faculty::Buddhi => FacultyOutput::Buddhi(BuddhiOutput::decode(map)),
        Faculty::Sanskaras => FacultyOutput::Sanskaras(SanskarasOutput::decode(map)),
    }
}

/// The sub-object a combined answer holds for `faculty`; empty when absent
/// or not an object, so every field takes its default.
pub fn nested(map: &Map<String, Value>, faculty: Faculty) -> Map<String, Value> {
    match map.get(faculty.name()) {
        Some(Value::Object(inner)) => inner.clone(),
        _ => Map::new(),
    }
}

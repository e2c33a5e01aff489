//! Structured output recovery.
//!
//! Models often wrap JSON answers in a markdown code fence. Recovery happens
//! in two separate steps: [`strip_code_fence`] removes an optional fence, and
//! [`decode_object`] parses what remains, failing with
//! [`CompletionError::Decode`] unless it is a JSON object.

use crate::error::CompletionError;
use soul_monitor::UsageCounters;
use serde_json::{Map, Value};

/// Maximum characters of offending text kept in a decode error.
const EXCERPT_CHARS: usize = 120;

/// Fence marker opening or closing a markdown code block.
const FENCE: &str = "```";

/// Strips an optional markdown code fence around a completion.
///
/// - Leading and trailing whitespace is trimmed
/// - If the text starts with a fence marker (optionally followed by a
///   language tag such as `json`), the first line is dropped
/// - If the last remaining line is a bare fence marker, it is dropped
///
/// Text without a leading fence is returned trimmed and otherwise untouched.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with(FENCE) {
        return trimmed;
    }

    let body = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return "",
    };

    let body = body.trim_end();
    match body.rfind('\n') {
        Some(idx) if body[idx + 1..].trim() == FENCE => &body[..idx],
        None if body.trim() == FENCE => "",
        _ => body,
    }
}

/// Decodes completion text into a JSON object.
///
/// # Errors
///
/// Returns [`CompletionError::Decode`] if the text (after fence stripping)
/// is not valid JSON, or is valid JSON but not an object.
pub fn decode_object(text: &str) -> Result<Map<String, Value>, CompletionError> {
    let body = strip_code_fence(text);

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CompletionError::Decode {
            reason: format!("expected a JSON object, found {}", kind(&other)),
            excerpt: excerpt(body),
            usage: UsageCounters::zero(),
        }),
        Err(e) => Err(CompletionError::Decode {
            reason: e.to_string(),
            excerpt: excerpt(body),
            usage: UsageCounters::zero(),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

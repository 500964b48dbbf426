//! Strict decoding of the canonical structured result.
//!
//! This is the deterministic first branch of the output formatter. The
//! runtime falls through to model-guided coercion when [`decode_structured`]
//! fails, and to [`StructuredResult::fallback`] when coercion fails too.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::types::StructuredResult;

/// Answer used when the source has none.
pub const DEFAULT_ANSWER: &str = "N/A";

/// Explanation of the safe default record.
pub const FALLBACK_EXPLANATION: &str = "Failed to format response";

/// Errors from strict decoding.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Strictly decode `text` as a JSON object carrying the canonical fields.
///
/// Missing keys take their defaults (`"N/A"`, `""`, `""`). Only an object is
/// accepted: `4` or `"text"` are valid JSON but not a structured result.
pub fn decode_structured(text: &str) -> Result<StructuredResult, DecodeError> {
    decode_structured_value(serde_json::from_str(text)?)
}

/// Decode an already-parsed JSON value with the same field rendering as
/// [`decode_structured`].
///
/// Non-string values keep their JSON text (`12` becomes `"12"`) and `null`
/// takes the field default.
pub fn decode_structured_value(value: JsonValue) -> Result<StructuredResult, DecodeError> {
    let JsonValue::Object(map) = value else {
        return Err(DecodeError::NotAnObject(json_kind(&value)));
    };

    Ok(StructuredResult {
        answer: field(&map, "answer", DEFAULT_ANSWER),
        explanation: field(&map, "explanation", ""),
        page_number: field(&map, "page_number", ""),
    })
}

fn field(map: &Map<String, JsonValue>, key: &str, default: &str) -> String {
    match map.get(key) {
        None | Some(JsonValue::Null) => default.to_string(),
        Some(JsonValue::String(s)) => s.clone(),
        // Numbers, booleans, arrays and objects keep their JSON text
        Some(other) => other.to_string(),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// How the formatter arrived at its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FormatOutcome {
    /// The response was already a JSON object
    Parsed { result: StructuredResult },

    /// The structured coercion capability extracted the fields
    Coerced { result: StructuredResult },

    /// Coercion failed; the safe default applies
    Fallback { error: String },
}

impl FormatOutcome {
    /// The structured result this outcome stands for.
    pub fn result(&self) -> StructuredResult {
        match self {
            FormatOutcome::Parsed { result } | FormatOutcome::Coerced { result } => result.clone(),
            FormatOutcome::Fallback { .. } => StructuredResult::fallback(),
        }
    }

    pub fn into_result(self) -> StructuredResult {
        match self {
            FormatOutcome::Parsed { result } | FormatOutcome::Coerced { result } => result,
            FormatOutcome::Fallback { .. } => StructuredResult::fallback(),
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            FormatOutcome::Parsed { .. } => "parsed",
            FormatOutcome::Coerced { .. } => "coerced",
            FormatOutcome::Fallback { .. } => "fallback",
        }
    }
}

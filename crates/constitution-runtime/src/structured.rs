//! Schemas for structured model output and lenient reply extraction.
//!
//! Unlike the formatter's strict first branch, replies to a structured
//! request may arrive wrapped in a code fence or surrounded by prose. The
//! extraction order is: whole reply, fenced block, outermost `{...}` span.

use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::capabilities::CapabilityError;
use crate::providers::ResponseSchema;

lazy_static! {
    static ref FENCED_JSON: Regex = Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").unwrap();
}

/// Build the response schema for `T` under `name`.
pub fn response_schema<T: JsonSchema>(name: &str) -> ResponseSchema {
    let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();

    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
    }

    ResponseSchema {
        name: name.to_string(),
        schema,
    }
}

/// Deserialize a structured reply, tolerating fences and surrounding prose.
pub fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T, CapabilityError> {
    let trimmed = reply.trim();

    let first_error = match serde_json::from_str::<T>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let candidates = FENCED_JSON
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .into_iter()
        .chain(outer_object(trimmed));

    for candidate in candidates {
        if let Ok(value) = serde_json::from_str::<T>(candidate) {
            return Ok(value);
        }
    }

    Err(CapabilityError::Malformed(format!(
        "{} (reply: {:?})",
        first_error,
        truncate(trimmed, 200)
    )))
}

fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use constitution_core::{Critique, StructuredResult};

    #[test]
    fn test_schema_has_wire_field_names() {
        let schema = response_schema::<Critique>("critique");
        assert_eq!(schema.name, "critique");
        assert!(schema.schema.get("$schema").is_none());

        let properties = &schema.schema["properties"];
        assert!(properties.get("critique_needed").is_some());
        assert!(properties.get("critique").is_some());
        assert!(properties.get("critique_text").is_none());
    }

    #[test]
    fn test_parse_plain_json() {
        let critique: Critique =
            parse_reply(r#"{"critique_needed": false, "critique": "Fine."}"#).unwrap();
        assert_eq!(critique, Critique::not_needed("Fine."));
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "Here you go:\n```json\n{\"answer\": \"4\", \"explanation\": \"sum\", \"page_number\": \"\"}\n```";
        let result: StructuredResult = parse_reply(reply).unwrap();
        assert_eq!(result, StructuredResult::new("4", "sum", ""));
    }

    #[test]
    fn test_parse_json_inside_prose() {
        let reply = r#"Sure. {"critique_needed": true, "critique": "Missing units."} Hope that helps."#;
        let critique: Critique = parse_reply(reply).unwrap();
        assert!(critique.critique_needed);
        assert_eq!(critique.critique_text, "Missing units.");
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let result = parse_reply::<Critique>(r#"{"needed": "maybe"}"#);
        assert!(matches!(result, Err(CapabilityError::Malformed(_))));

        let result = parse_reply::<Critique>("no json here");
        assert!(matches!(result, Err(CapabilityError::Malformed(_))));
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("hi", 5), "hi");
    }
}

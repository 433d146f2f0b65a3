//! Lenient JSON extraction from model output

use maitre_common::{MaitreError, Result};
use serde_json::Value;

/// Parse the JSON document contained in a model reply.
///
/// Models frequently wrap JSON in markdown fences or add a sentence before
/// it; this strips fences and falls back to the outermost `{...}` or `[...]`.
pub fn extract_json(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let unfenced = strip_fences(trimmed);
    if let Ok(value) = serde_json::from_str(unfenced) {
        return Ok(value);
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (unfenced.find(open), unfenced.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str(&unfenced[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }

    Err(MaitreError::InvalidJson(maitre_common::truncate_string(
        trimmed, 200,
    )))
}

fn strip_fences(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        assert_eq!(extract_json(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"language\": \"ru\"}\n```";
        assert_eq!(extract_json(raw).unwrap(), json!({"language": "ru"}));
    }

    #[test]
    fn test_json_with_preamble() {
        let raw = "Sure! Here it is: {\"ok\": true} Hope that helps.";
        assert_eq!(extract_json(raw).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            extract_json("no json here"),
            Err(MaitreError::InvalidJson(_))
        ));
    }
}

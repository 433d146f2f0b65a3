//! Tool schemas shared between the LLM layer and the tool registry

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A callable function the model may invoke, described as JSON schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }

    /// Names of the required parameters declared in the schema
    pub fn required_parameters(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(|r| r.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }

    /// Convert to a genai Tool
    pub fn to_genai_tool(&self) -> genai::chat::Tool {
        genai::chat::Tool::new(self.name.clone())
            .with_description(self.description.clone())
            .with_schema(self.parameters.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_parameters() {
        let tool = ToolDefinition::new("check_availability", "Check a slot").with_parameters(json!({
            "type": "object",
            "properties": {
                "date": {"type": "string"},
                "guests": {"type": "number"}
            },
            "required": ["date", "guests"]
        }));

        assert_eq!(tool.required_parameters(), vec!["date", "guests"]);
        assert!(ToolDefinition::new("noop", "").required_parameters().is_empty());
    }
}

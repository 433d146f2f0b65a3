//! Tagged success/failure envelope returned by every tool backend

use maitre_common::{ErrorKind, MaitreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolStatus {
    Success,
    Failure,
}

/// Categorized tool error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub code: Option<String>,
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEnvelope {
    pub tool_status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolEnvelope {
    pub fn success(data: Value) -> Self {
        Self {
            tool_status: ToolStatus::Success,
            data: Some(data),
            error: None,
            metadata: None,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            tool_status: ToolStatus::Failure,
            data: None,
            error: Some(ToolFailure {
                kind,
                message: message.into(),
                code: code.map(str::to_string),
                details: None,
            }),
            metadata: None,
        }
    }

    pub fn system_error(message: impl Into<String>) -> Self {
        Self::failure(ErrorKind::SystemError, message, None)
    }

    pub fn validation_error(message: impl Into<String>, field: &str) -> Self {
        let mut envelope = Self::failure(ErrorKind::ValidationError, message, Some("INVALID_INPUT"));
        if let Some(error) = envelope.error.as_mut() {
            error.details = Some(serde_json::json!({ "field": field }));
        }
        envelope
    }

    pub fn business_rule(message: impl Into<String>, code: &str) -> Self {
        Self::failure(ErrorKind::BusinessRule, message, Some(code))
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_success(&self) -> bool {
        self.tool_status == ToolStatus::Success
    }

    /// Convert a failure into a typed error; successes yield their data
    pub fn into_result(self) -> Result<Value, MaitreError> {
        match (self.tool_status, self.data, self.error) {
            (ToolStatus::Success, data, _) => Ok(data.unwrap_or(Value::Null)),
            (ToolStatus::Failure, _, Some(failure)) => Err(match failure.kind {
                ErrorKind::ValidationError => MaitreError::Validation {
                    message: failure.message,
                    example: None,
                },
                ErrorKind::BusinessRule => MaitreError::BusinessRule {
                    message: failure.message,
                    suggestion: None,
                },
                ErrorKind::SystemError => MaitreError::Tool {
                    tool: failure.code.unwrap_or_else(|| "unknown".to_string()),
                    message: failure.message,
                },
            }),
            (ToolStatus::Failure, _, None) => Err(MaitreError::Other(
                "Tool failed without an error description".to_string(),
            )),
        }
    }
}

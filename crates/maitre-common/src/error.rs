//! Maitre Common Error Types
//!
//! Centralized error handling for all Maitre components. Every variant
//! carries its own [`ErrorKind`] and recoverability, so callers never have to
//! inspect message text to decide how to react.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Main error type for Maitre operations
#[derive(Debug, Error)]
pub enum MaitreError {
    /// The LLM provider failed or returned an unusable answer
    #[error("LLM error: {0}")]
    Llm(String),

    /// An LLM call did not complete within its deadline
    #[error("LLM call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The model was asked for JSON and returned something else
    #[error("Invalid JSON from model: {0}")]
    InvalidJson(String),

    /// Malformed guest input
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        example: Option<String>,
    },

    /// A domain constraint was violated (e.g. no availability)
    #[error("Business rule violated: {message}")]
    BusinessRule {
        message: String,
        suggestion: Option<String>,
    },

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Tenant is suspended or otherwise not serving
    #[error("Tenant {tenant_id} is {status}; AI agents are only available for active or trial accounts")]
    TenantInactive { tenant_id: String, status: String },

    /// Tenant plan or feature flags do not allow the requested agent
    #[error("The {agent_type} agent requires {requirement}. Your current plan is {current_plan}; upgrade your plan to enable it.")]
    Entitlement {
        agent_type: String,
        current_plan: String,
        requirement: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database/storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Tool execution errors
    #[error("Tool error: {tool}: {message}")]
    Tool { tool: String, message: String },

    /// Unrecoverable infrastructure failure
    #[error("Fatal system error: {0}")]
    Fatal(String),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Anything else bubbling up from a collaborator
    #[error("{0}")]
    Other(String),
}

/// Coarse error taxonomy surfaced to callers and tool envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// LLM/infrastructure failure
    SystemError,
    /// Malformed user input
    ValidationError,
    /// Domain constraint violated
    BusinessRule,
}

impl ErrorKind {
    /// Wire name used in tool envelopes
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SystemError => "SYSTEM_ERROR",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::BusinessRule => "BUSINESS_RULE",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MaitreError {
    /// Convenience constructor for validation errors with a corrective example
    pub fn validation(message: impl Into<String>, example: impl Into<String>) -> Self {
        MaitreError::Validation {
            message: message.into(),
            example: Some(example.into()),
        }
    }

    /// Convenience constructor for business-rule errors with a suggested next step
    pub fn business_rule(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        MaitreError::BusinessRule {
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Taxonomy bucket of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MaitreError::Validation { .. } | MaitreError::InvalidJson(_) => {
                ErrorKind::ValidationError
            }
            MaitreError::BusinessRule { .. }
            | MaitreError::NotFound(_)
            | MaitreError::TenantInactive { .. }
            | MaitreError::Entitlement { .. } => ErrorKind::BusinessRule,
            MaitreError::Llm(_)
            | MaitreError::Timeout(_)
            | MaitreError::Config(_)
            | MaitreError::Storage(_)
            | MaitreError::Tool { .. }
            | MaitreError::Fatal(_)
            | MaitreError::Io(_)
            | MaitreError::Serde(_)
            | MaitreError::Other(_) => ErrorKind::SystemError,
        }
    }

    /// Whether the conversation can continue after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, MaitreError::Fatal(_))
    }

    /// Whether this error is a tenant policy decision the caller must surface
    pub fn is_tenant_policy(&self) -> bool {
        matches!(
            self,
            MaitreError::TenantInactive { .. } | MaitreError::Entitlement { .. }
        )
    }
}

/// Convenience result type for Maitre operations
pub type Result<T> = std::result::Result<T, MaitreError>;

impl From<anyhow::Error> for MaitreError {
    fn from(err: anyhow::Error) -> Self {
        MaitreError::Other(err.to_string())
    }
}

impl From<toml::de::Error> for MaitreError {
    fn from(err: toml::de::Error) -> Self {
        MaitreError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_variants() {
        assert_eq!(
            MaitreError::Llm("boom".into()).kind(),
            ErrorKind::SystemError
        );
        assert_eq!(
            MaitreError::validation("bad date", "2025-07-14").kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(
            MaitreError::business_rule("fully booked", "try 20:30").kind(),
            ErrorKind::BusinessRule
        );
    }

    #[test]
    fn test_only_fatal_is_unrecoverable() {
        assert!(MaitreError::Timeout(Duration::from_secs(30)).is_recoverable());
        // Message text no longer matters: a "CRITICAL" LLM error is still recoverable
        assert!(MaitreError::Llm("CRITICAL upstream".into()).is_recoverable());
        assert!(!MaitreError::Fatal("database gone".into()).is_recoverable());
    }

    #[test]
    fn test_entitlement_message_prompts_upgrade() {
        let err = MaitreError::Entitlement {
            agent_type: "conductor".into(),
            current_plan: "starter".into(),
            requirement: "the professional or enterprise plan".into(),
        };
        assert!(err.to_string().contains("upgrade"));
        assert!(err.is_tenant_policy());
    }

    #[test]
    fn test_error_kind_wire_names() {
        assert_eq!(ErrorKind::SystemError.as_str(), "SYSTEM_ERROR");
        assert_eq!(
            serde_json::to_string(&ErrorKind::BusinessRule).unwrap(),
            "\"BUSINESS_RULE\""
        );
    }
}

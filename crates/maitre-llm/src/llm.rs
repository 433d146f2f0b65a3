//! LLM provider contract
//!
//! Agents talk to the model only through [`AiService`]. Every call carries
//! the tenant context so the provider can enforce tenant-level quotas; there
//! is intentionally no way to call the model without one.

use crate::tools::ToolDefinition;
use async_trait::async_trait;
use maitre_common::{Result, TenantContext, timeouts};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Per-call generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier understood by the provider
    pub model: String,

    /// Model to retry with when the primary one fails
    pub fallback_model: Option<String>,

    pub max_tokens: u32,

    pub temperature: f64,

    /// Hard deadline for the call
    pub timeout: Duration,

    /// Free-form label for logs (e.g. "sofia-conversation")
    pub context_label: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: maitre_common::models::CLAUDE_SONNET.to_string(),
            fallback_model: None,
            max_tokens: 1000,
            temperature: 0.7,
            timeout: Duration::from_secs(timeouts::DEFAULT_LLM_TIMEOUT),
            context_label: "agent".to_string(),
        }
    }
}

impl GenerationOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.context_label = label.into();
        self
    }
}

/// A prior turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum ChatMessage {
    User(String),
    Assistant(String),
}

/// A conversational request that may result in tool calls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub system_prompt: String,
    pub history: Vec<ChatMessage>,
    pub message: String,
    pub tools: Vec<ToolDefinition>,
}

/// A structured intent emitted by the model naming a backend function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    /// Tool call created by an agent rather than by the model
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }
}

/// What the model produced for one conversational turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmTurn {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl LlmTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text: None,
            tool_calls,
        }
    }
}

/// A trait for AI services that can generate responses
#[async_trait]
pub trait AiService: Send + Sync {
    /// Generate free text for a single prompt
    async fn generate_content(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        tenant: &TenantContext,
    ) -> Result<String>;

    /// Generate a JSON document for a single prompt
    async fn generate_json(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        tenant: &TenantContext,
    ) -> Result<Value>;

    /// Run one conversational turn with tools available to the model
    async fn generate_turn(
        &self,
        request: &ChatTurnRequest,
        options: &GenerationOptions,
        tenant: &TenantContext,
    ) -> Result<LlmTurn>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builders() {
        let options = GenerationOptions::default()
            .with_timeout(Duration::from_secs(5))
            .with_max_tokens(50)
            .with_temperature(0.0)
            .with_label("health-probe");

        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.max_tokens, 50);
        assert_eq!(options.context_label, "health-probe");
    }

    #[test]
    fn test_agent_created_tool_calls_have_unique_ids() {
        let a = ToolCall::new("create_reservation", serde_json::json!({}));
        let b = ToolCall::new("create_reservation", serde_json::json!({}));
        assert!(a.id.starts_with("call_"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_chat_message_serialization() {
        let json = serde_json::to_value(ChatMessage::User("hi".into())).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }
}

//! Collaborator that executes tool calls against the booking backend

use crate::envelope::ToolEnvelope;
use async_trait::async_trait;
use maitre_common::{Language, TenantContext};
use maitre_llm::ToolCall;
use serde::{Deserialize, Serialize};

/// Ambient data a backend needs to run a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolContext {
    pub restaurant_id: i64,
    pub timezone: String,
    pub language: Language,
    pub session_id: Option<String>,
    pub tenant: TenantContext,
}

/// Executes tool calls; failures are reported inside the envelope, never as `Err`
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolEnvelope;

    /// Names of the tools this backend can run
    fn supported_tools(&self) -> Vec<String>;
}

//! `genai`-backed implementation of [`AiService`]
//!
//! Every call is bounded by `options.timeout`, retried once on the fallback
//! model when one is configured, and counted against the tenant's quota.

use crate::json::extract_json;
use crate::llm::{AiService, ChatMessage, ChatTurnRequest, GenerationOptions, LlmTurn, ToolCall};
use async_trait::async_trait;
use genai::Client as GenaiClient;
use genai::chat::{
    ChatMessage as GenaiChatMessage, ChatOptions, ChatRequest, ContentPart, MessageContent,
};
use maitre_common::{MaitreError, Result, TenantContext};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Per-tenant request ceiling enforced before calling the provider
#[derive(Debug, Clone, Default)]
pub struct QuotaPolicy {
    /// `None` means unlimited
    pub max_requests_per_tenant: Option<u64>,
}

/// A service for interacting with LLMs through `genai`
pub struct GenaiService {
    client: GenaiClient,
    quota: QuotaPolicy,
    usage: RwLock<HashMap<String, u64>>,
}

impl GenaiService {
    pub fn new() -> Self {
        Self::with_quota(QuotaPolicy::default())
    }

    pub fn with_quota(quota: QuotaPolicy) -> Self {
        let client = GenaiClient::builder()
            .with_chat_options(ChatOptions {
                capture_content: Some(true),
                capture_tool_calls: Some(true),
                capture_usage: Some(true),
                ..Default::default()
            })
            .build();

        Self {
            client,
            quota,
            usage: RwLock::new(HashMap::new()),
        }
    }

    /// Requests made so far on behalf of a tenant
    pub async fn requests_for(&self, tenant_id: &str) -> u64 {
        self.usage.read().await.get(tenant_id).copied().unwrap_or(0)
    }

    async fn charge(&self, tenant: &TenantContext) -> Result<()> {
        let tenant_id = tenant.tenant_id();
        let mut usage = self.usage.write().await;
        let used = usage.entry(tenant_id.clone()).or_insert(0);

        if let Some(limit) = self.quota.max_requests_per_tenant {
            if *used >= limit {
                warn!(tenant_id = %tenant_id, limit, "Tenant LLM quota exhausted");
                return Err(MaitreError::business_rule(
                    format!("AI request quota of {} reached for this restaurant", limit),
                    "Upgrade your plan or wait for the next billing period",
                ));
            }
        }

        *used += 1;
        Ok(())
    }

    fn chat_options(options: &GenerationOptions) -> ChatOptions {
        ChatOptions {
            temperature: Some(options.temperature),
            max_tokens: Some(options.max_tokens),
            ..Default::default()
        }
    }

    /// Execute a chat request on the primary model, then on the fallback model
    async fn exec(
        &self,
        request: ChatRequest,
        options: &GenerationOptions,
    ) -> Result<Vec<MessageContent>> {
        let chat_options = Self::chat_options(options);
        let started = Instant::now();

        let primary = tokio::time::timeout(
            options.timeout,
            self.client
                .exec_chat(&options.model, request.clone(), Some(&chat_options)),
        )
        .await;

        let error = match primary {
            Ok(Ok(response)) => {
                debug!(
                    model = %options.model,
                    label = %options.context_label,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "LLM call completed"
                );
                return Ok(response.content);
            }
            Ok(Err(e)) => MaitreError::Llm(format!("GenAI API error: {}", e)),
            Err(_) => MaitreError::Timeout(options.timeout),
        };

        let Some(fallback) = options.fallback_model.as_deref() else {
            return Err(error);
        };

        info!(
            primary = %options.model,
            fallback,
            error = %error,
            "Primary model failed, retrying on fallback model"
        );

        match tokio::time::timeout(
            options.timeout,
            self.client.exec_chat(fallback, request, Some(&chat_options)),
        )
        .await
        {
            Ok(Ok(response)) => Ok(response.content),
            Ok(Err(e)) => Err(MaitreError::Llm(format!("GenAI API error: {}", e))),
            Err(_) => Err(MaitreError::Timeout(options.timeout)),
        }
    }

    fn into_turn(contents: Vec<MessageContent>) -> LlmTurn {
        let mut turn = LlmTurn::default();
        let mut texts = Vec::new();

        for content in contents {
            match content {
                MessageContent::Text(text) => texts.push(text),
                MessageContent::Parts(parts) => {
                    texts.extend(parts.into_iter().filter_map(|part| match part {
                        ContentPart::Text(text) => Some(text),
                        _ => None,
                    }));
                }
                MessageContent::ToolCalls(calls) => {
                    turn.tool_calls.extend(calls.into_iter().map(|call| ToolCall {
                        id: call.call_id,
                        name: call.fn_name,
                        arguments: call.fn_arguments,
                    }));
                }
                MessageContent::ToolResponses(_) => {
                    warn!("LLM unexpectedly returned tool responses");
                }
            }
        }

        if !texts.is_empty() {
            turn.text = Some(texts.join(" "));
        }
        turn
    }
}

impl Default for GenaiService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiService for GenaiService {
    async fn generate_content(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        tenant: &TenantContext,
    ) -> Result<String> {
        self.charge(tenant).await?;

        let request = ChatRequest::new(vec![GenaiChatMessage::user(prompt)]);
        let turn = Self::into_turn(self.exec(request, options).await?);

        turn.text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| MaitreError::Llm("No text content in chat response".to_string()))
    }

    async fn generate_json(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        tenant: &TenantContext,
    ) -> Result<Value> {
        let prompt = format!(
            "{}\n\nRespond with a single valid JSON document and nothing else.",
            prompt
        );
        let text = self.generate_content(&prompt, options, tenant).await?;
        extract_json(&text)
    }

    async fn generate_turn(
        &self,
        request: &ChatTurnRequest,
        options: &GenerationOptions,
        tenant: &TenantContext,
    ) -> Result<LlmTurn> {
        self.charge(tenant).await?;

        let mut messages: Vec<GenaiChatMessage> = request
            .history
            .iter()
            .map(|msg| match msg {
                ChatMessage::User(content) => GenaiChatMessage::user(content.clone()),
                ChatMessage::Assistant(content) => GenaiChatMessage::assistant(content.clone()),
            })
            .collect();
        messages.push(GenaiChatMessage::user(request.message.clone()));

        let mut chat_req = ChatRequest::new(messages).with_system(request.system_prompt.clone());
        if !request.tools.is_empty() {
            chat_req = chat_req.with_tools(
                request
                    .tools
                    .iter()
                    .map(|tool| tool.to_genai_tool())
                    .collect::<Vec<_>>(),
            );
        }

        debug!(
            tenant_id = %tenant.tenant_id(),
            tools = request.tools.len(),
            history = request.history.len(),
            "Executing conversational turn"
        );

        Ok(Self::into_turn(self.exec(chat_req, options).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maitre_common::{TenantPlan, TenantStatus};

    fn tenant() -> TenantContext {
        TenantContext::new(1, "Demo", TenantStatus::Active, TenantPlan::Starter)
    }

    #[tokio::test]
    async fn test_quota_is_enforced_before_calling_provider() {
        let service = GenaiService::with_quota(QuotaPolicy {
            max_requests_per_tenant: Some(0),
        });

        let err = service
            .generate_content("hello", &GenerationOptions::default(), &tenant())
            .await
            .unwrap_err();

        assert!(matches!(err, MaitreError::BusinessRule { .. }));
        assert_eq!(service.requests_for("1").await, 0);
    }

    #[test]
    fn test_into_turn_collects_text_and_tool_calls() {
        let turn = GenaiService::into_turn(vec![MessageContent::Text("Hello".into())]);
        assert_eq!(turn.text.as_deref(), Some("Hello"));
        assert!(turn.tool_calls.is_empty());
    }
}

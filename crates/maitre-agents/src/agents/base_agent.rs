//! Base agent implementation
//!
//! Every specialist wraps a [`BaseAgent`], which owns the shared services:
//! timed LLM calls with tenant context, JSON generation with one retry,
//! translation, reservation-context delegation, uniform error responses and
//! health probes.

use crate::agents::{AgentConfig, AgentContext, AgentErrorInfo, AgentResponse, AgentType};
use crate::factory::AgentServices;
use crate::health::HealthReport;
use crate::locale::{self, Text};
use chrono::{DateTime, Utc};
use maitre_common::{Language, MaitreError, RestaurantConfig, Result, TenantContext};
use maitre_llm::{ChatTurnRequest, GenerationOptions, LlmTurn, ToolCall, ToolDefinition};
use maitre_storage::{BookingSession, ContextResolution, ConversationFlags};
use maitre_tools::{ToolContext, ToolEnvelope};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// What kind of guest-facing text is being translated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Greeting,
    Confirmation,
    Error,
    Question,
    Info,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Greeting => "greeting",
            MessageKind::Confirmation => "confirmation",
            MessageKind::Error => "error",
            MessageKind::Question => "question",
            MessageKind::Info => "info",
        }
    }
}

/// Performance counters for one agent instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub agent_type: AgentType,
    pub llm_requests: u64,
    pub llm_failures: u64,
    pub handled_errors: u64,
    pub avg_latency_ms: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Counters {
    llm_requests: AtomicU64,
    llm_failures: AtomicU64,
    handled_errors: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Shared foundation for the specialist agents
pub struct BaseAgent {
    agent_type: AgentType,
    config: AgentConfig,
    restaurant: Arc<RestaurantConfig>,
    services: AgentServices,
    counters: Counters,
    created_at: DateTime<Utc>,
}

impl BaseAgent {
    pub fn new(
        agent_type: AgentType,
        config: AgentConfig,
        restaurant: Arc<RestaurantConfig>,
        services: AgentServices,
    ) -> Self {
        Self {
            agent_type,
            config,
            restaurant,
            services,
            counters: Counters::default(),
            created_at: Utc::now(),
        }
    }

    pub fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn restaurant(&self) -> &RestaurantConfig {
        &self.restaurant
    }

    fn default_options(&self) -> GenerationOptions {
        self.config.generation_options(self.agent_type.as_str())
    }

    /// Run one LLM future under its timeout and record the outcome
    async fn timed<T, F>(&self, label: &str, timeout: Duration, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        self.counters.llm_requests.fetch_add(1, Ordering::Relaxed);

        let result = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(MaitreError::Timeout(timeout)),
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        self.counters
            .total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);

        match &result {
            Ok(_) => debug!(
                agent_type = %self.agent_type,
                label,
                latency_ms,
                "LLM call completed"
            ),
            Err(e) => {
                self.counters.llm_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    agent_type = %self.agent_type,
                    label,
                    latency_ms,
                    error = %e,
                    "LLM call failed"
                );
            }
        }
        result
    }

    /// Free-text completion; errors are returned to the caller
    pub async fn generate_response(
        &self,
        prompt: &str,
        ctx: &AgentContext,
        options: Option<GenerationOptions>,
    ) -> Result<String> {
        let options = options.unwrap_or_else(|| self.default_options());
        self.timed(
            &options.context_label,
            options.timeout,
            self.services
                .llm
                .generate_content(prompt, &options, &ctx.tenant),
        )
        .await
    }

    /// Structured completion, retried once when the model returns invalid JSON
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        ctx: &AgentContext,
        options: Option<GenerationOptions>,
    ) -> Result<T> {
        let options = options.unwrap_or_else(|| self.default_options());
        let mut prompt = prompt.to_string();
        let mut retried = false;

        loop {
            let attempt = self
                .timed(
                    &options.context_label,
                    options.timeout,
                    self.services.llm.generate_json(&prompt, &options, &ctx.tenant),
                )
                .await
                .and_then(|value| {
                    serde_json::from_value::<T>(value)
                        .map_err(|e| MaitreError::InvalidJson(e.to_string()))
                });

            match attempt {
                Err(MaitreError::InvalidJson(reason)) if !retried => {
                    debug!(agent_type = %self.agent_type, %reason, "Retrying JSON generation");
                    retried = true;
                    prompt.push_str(
                        "\n\nYour previous answer was not valid JSON for the requested shape. \
                         Respond with a single valid JSON object only.",
                    );
                }
                other => return other,
            }
        }
    }

    /// One chat turn with history and tools
    pub async fn converse(
        &self,
        system_prompt: String,
        message: &str,
        ctx: &AgentContext,
        tools: Vec<ToolDefinition>,
    ) -> Result<LlmTurn> {
        let options = self.default_options();
        let request = ChatTurnRequest {
            system_prompt,
            history: ctx.history.clone(),
            message: message.to_string(),
            tools,
        };
        self.timed(
            &options.context_label,
            options.timeout,
            self.services
                .llm
                .generate_turn(&request, &options, &ctx.tenant),
        )
        .await
    }

    /// Translate guest-facing text; the original is returned on any failure
    pub async fn translate(
        &self,
        text: &str,
        target: Language,
        ctx: &AgentContext,
        kind: MessageKind,
    ) -> String {
        if !self.config.enable_translation || !target.needs_translation() || text.trim().is_empty()
        {
            return text.to_string();
        }

        let prompt = format!(
            "Translate this restaurant {} message to {}. Keep the tone, formatting, \
             numbers and emoji exactly as they are. Reply with the translation only.\n\n{}",
            kind.as_str(),
            target.display_name(),
            text
        );
        let options = self.default_options().with_temperature(0.2).with_label("translation");

        match self.generate_response(&prompt, ctx, Some(options)).await {
            Ok(translated) if !translated.trim().is_empty() => translated.trim().to_string(),
            Ok(_) => text.to_string(),
            Err(e) => {
                warn!(agent_type = %self.agent_type, language = %target, error = %e, "Translation failed, keeping original text");
                text.to_string()
            }
        }
    }

    fn session_for(&self, ctx: &AgentContext) -> BookingSession {
        ctx.session.clone().unwrap_or_else(|| {
            BookingSession::new(
                format!("transient-{}", ctx.restaurant_id),
                ctx.restaurant_id,
                ctx.language,
            )
        })
    }

    /// Which reservation does the guest mean?
    pub async fn resolve_reservation_context(
        &self,
        message: &str,
        ctx: &AgentContext,
        provided_id: Option<i64>,
    ) -> ContextResolution {
        if !self.config.enable_context_resolution {
            return ContextResolution::fallback(provided_id);
        }

        let session = self.session_for(ctx);
        match self
            .services
            .context
            .resolve_reservation_from_context(message, &session, provided_id)
            .await
        {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(agent_type = %self.agent_type, error = %e, "Context resolution failed");
                ContextResolution::fallback(provided_id)
            }
        }
    }

    /// Remember the reservation the guest is working on
    pub async fn preserve_context(&self, ctx: &AgentContext, reservation_id: i64, operation: &str) {
        let Some(session) = &ctx.session else {
            return;
        };
        if let Err(e) = self
            .services
            .context
            .preserve_reservation_context(session, reservation_id, operation)
            .await
        {
            warn!(agent_type = %self.agent_type, reservation_id, error = %e, "Failed to preserve reservation context");
        }
    }

    pub async fn update_conversation_flags(&self, ctx: &AgentContext, flags: &ConversationFlags) {
        let Some(session) = &ctx.session else {
            return;
        };
        if let Err(e) = self
            .services
            .context
            .update_conversation_flags(session, flags)
            .await
        {
            warn!(agent_type = %self.agent_type, error = %e, "Failed to update conversation flags");
        }
    }

    pub fn tool_context(&self, ctx: &AgentContext) -> ToolContext {
        ToolContext {
            restaurant_id: ctx.restaurant_id,
            timezone: ctx.timezone.clone(),
            language: ctx.language,
            session_id: ctx.session_id().map(str::to_string),
            tenant: ctx.tenant.clone(),
        }
    }

    pub async fn execute_tool(&self, call: &ToolCall, ctx: &AgentContext) -> ToolEnvelope {
        debug!(agent_type = %self.agent_type, tool = %call.name, "Executing tool");
        self.services
            .executor
            .execute(call, &self.tool_context(ctx))
            .await
    }

    /// Turn any failure into an apologetic response the guest can read
    pub fn handle_agent_error(
        &self,
        err: &MaitreError,
        location: &str,
        language: Language,
    ) -> AgentResponse {
        self.counters.handled_errors.fetch_add(1, Ordering::Relaxed);
        let kind = err.kind();
        let recoverable = err.is_recoverable();

        if recoverable {
            warn!(agent_type = %self.agent_type, location, error_kind = %kind, error = %err, "Agent error");
        } else {
            error!(agent_type = %self.agent_type, location, error_kind = %kind, error = %err, "Unrecoverable agent error");
        }

        let content = match err {
            MaitreError::Validation {
                example: Some(example),
                ..
            } => locale::render(language, Text::ValidationHint, &[("example", example)]),
            MaitreError::BusinessRule {
                message,
                suggestion: Some(suggestion),
            } => format!("{} {}", message, suggestion),
            _ => locale::text(language, Text::Apology).to_string(),
        };

        let mut response = AgentResponse::new(self.agent_type, content);
        response.error = Some(AgentErrorInfo {
            kind,
            message: err.to_string(),
            recoverable,
        });
        response
    }

    /// Probe the LLM, context, translation and tool paths
    pub async fn health_check(
        &self,
        tenant: &TenantContext,
        tools: &[ToolDefinition],
    ) -> HealthReport {
        let mut report = HealthReport::new();
        let probe_ctx = AgentContext::new(tenant.clone(), self.restaurant.timezone.clone(), Language::En);
        let probe_options = self
            .default_options()
            .with_timeout(self.config.health_timeout)
            .with_max_tokens(10)
            .with_temperature(0.0)
            .with_label("health-probe");

        match self
            .generate_response("Reply with the single word OK.", &probe_ctx, Some(probe_options.clone()))
            .await
        {
            Ok(reply) if !reply.trim().is_empty() => report.record("llm", true, "responded"),
            Ok(_) => report.record("llm", false, "empty reply"),
            Err(e) => report.record("llm", false, e.to_string()),
        }

        let session = BookingSession::new("health-probe", tenant.restaurant_id, Language::En);
        match self
            .services
            .context
            .resolve_reservation_from_context("Can I change booking #1?", &session, None)
            .await
        {
            Ok(resolution) => report.record("context", true, format!("method {}", resolution.method)),
            Err(e) => report.record("context", false, e.to_string()),
        }

        if self.config.enable_translation {
            let prompt = "Translate to Russian, reply with the translation only: Thank you";
            match self
                .generate_response(prompt, &probe_ctx, Some(probe_options.with_label("translation-probe")))
                .await
            {
                Ok(reply) if !reply.trim().is_empty() => report.record("translation", true, "responded"),
                Ok(_) => report.record("translation", false, "empty reply"),
                Err(e) => report.record("translation", false, e.to_string()),
            }
        } else {
            report.record("translation", true, "disabled");
        }

        let supported = self.services.executor.supported_tools();
        let missing: Vec<&str> = tools
            .iter()
            .map(|t| t.name.as_str())
            .filter(|name| !supported.iter().any(|s| s == name))
            .collect();
        if missing.is_empty() {
            report.record("tools", true, format!("{} tools available", tools.len()));
        } else {
            report.record("tools", false, format!("missing {}", missing.join(", ")));
        }

        report
    }

    pub fn stats(&self) -> AgentStats {
        let requests = self.counters.llm_requests.load(Ordering::Relaxed);
        let latency = self.counters.total_latency_ms.load(Ordering::Relaxed);
        AgentStats {
            agent_type: self.agent_type,
            llm_requests: requests,
            llm_failures: self.counters.llm_failures.load(Ordering::Relaxed),
            handled_errors: self.counters.handled_errors.load(Ordering::Relaxed),
            avg_latency_ms: if requests == 0 { 0 } else { latency / requests },
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockAiService, MockReply, base_agent, context};
    use maitre_common::ErrorKind;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Slot {
        time: String,
    }

    #[tokio::test]
    async fn test_generate_json_retries_once() {
        let llm = MockAiService::new(vec![
            MockReply::Json(serde_json::json!({"wrong": true})),
            MockReply::Json(serde_json::json!({"time": "19:00"})),
        ]);
        let agent = base_agent(AgentType::Booking, llm.clone());

        let slot: Slot = agent.generate_json("slot?", &context(), None).await.unwrap();
        assert_eq!(slot.time, "19:00");
        assert_eq!(llm.prompts().await.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_json_gives_up_after_retry() {
        let llm = MockAiService::new(vec![
            MockReply::Json(serde_json::json!({"wrong": true})),
            MockReply::Json(serde_json::json!({"still": "wrong"})),
        ]);
        let agent = base_agent(AgentType::Booking, llm);

        let err = agent
            .generate_json::<Slot>("slot?", &context(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MaitreError::InvalidJson(_)));
        assert_eq!(agent.stats().llm_requests, 2);
    }

    #[tokio::test]
    async fn test_translation_failure_returns_original() {
        let llm = MockAiService::new(vec![MockReply::Fail("provider down".into())]);
        let agent = base_agent(AgentType::Booking, llm);
        let ctx = context();

        let text = agent
            .translate("Your table is ready", Language::Ru, &ctx, MessageKind::Confirmation)
            .await;
        assert_eq!(text, "Your table is ready");
        assert_eq!(agent.stats().llm_failures, 1);
    }

    #[tokio::test]
    async fn test_translation_skipped_for_english() {
        let llm = MockAiService::new(vec![]);
        let agent = base_agent(AgentType::Booking, llm.clone());

        let text = agent
            .translate("Hello", Language::En, &context(), MessageKind::Greeting)
            .await;
        assert_eq!(text, "Hello");
        assert!(llm.prompts().await.is_empty());
    }

    #[tokio::test]
    async fn test_error_response_is_localized_and_typed() {
        let agent = base_agent(AgentType::Booking, MockAiService::new(vec![]));

        let response = agent.handle_agent_error(
            &MaitreError::Llm("CRITICAL upstream".into()),
            "handle_message",
            Language::Ru,
        );
        assert!(response.content.starts_with("Извините"));
        let info = response.error.unwrap();
        assert_eq!(info.kind, ErrorKind::SystemError);
        assert!(info.recoverable);

        let response = agent.handle_agent_error(
            &MaitreError::validation("bad date", "2030-07-14"),
            "handle_message",
            Language::En,
        );
        assert!(response.content.contains("2030-07-14"));

        let fatal = agent.handle_agent_error(&MaitreError::Fatal("disk".into()), "x", Language::En);
        assert!(!fatal.error.unwrap().recoverable);
        assert_eq!(agent.stats().handled_errors, 3);
    }

    #[tokio::test]
    async fn test_health_check_reports_each_path() {
        let llm = MockAiService::new(vec![
            MockReply::Text("OK".into()),
            MockReply::Fail("quota".into()),
        ]);
        let agent = base_agent(AgentType::Booking, llm);
        let tools = maitre_tools::tools_for(&[maitre_tools::BookingTool::CreateReservation]);

        let report = agent.health_check(&context().tenant, &tools).await;
        assert_eq!(report.checks.get("llm"), Some(&true));
        assert_eq!(report.checks.get("context"), Some(&true));
        assert_eq!(report.checks.get("translation"), Some(&false));
        assert_eq!(report.checks.get("tools"), Some(&true));
        assert!(!report.healthy);
    }

    #[tokio::test]
    async fn test_context_resolution_falls_back_when_disabled() {
        let mut agent = base_agent(AgentType::Reservations, MockAiService::new(vec![]));
        agent.config.enable_context_resolution = false;

        let resolution = agent
            .resolve_reservation_context("change #12", &context(), Some(7))
            .await;
        assert_eq!(resolution.resolved_id, Some(7));
        assert!(resolution.should_ask_for_clarification);
    }
}

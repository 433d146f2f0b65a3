//! Agent module for the booking conversation
//!
//! This module provides the core agent abstraction, the per-message context
//! handed to agents and the uniform response they produce.

pub mod apollo;
pub mod base_agent;
pub mod conductor;
pub mod maya;
pub mod sofia;

pub use apollo::ApolloAgent;
pub use base_agent::{AgentStats, BaseAgent, MessageKind};
pub use conductor::ConductorAgent;
pub use maya::MayaAgent;
pub use sofia::SofiaAgent;

use crate::alternatives::RankedAlternative;
use crate::health::HealthReport;
use crate::state::{ConversationState, FailureContext, GatheringInfo, MinimalContext};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maitre_common::{
    DEFAULT_MAX_CLARIFICATION_ATTEMPTS, ErrorKind, GuestHistory, Language, MaitreConfig,
    MaitreError, TenantContext,
};
use maitre_llm::{ChatMessage, GenerationOptions, ToolCall, ToolDefinition};
use maitre_storage::{BookingSession, ConversationFlags};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Core trait for booking agents
///
/// `handle_message` never fails: errors are turned into an apologetic
/// [`AgentResponse`] carrying the error category.
#[async_trait]
pub trait Agent: Send + Sync {
    fn agent_type(&self) -> AgentType;

    /// Persona name shown to guests
    fn name(&self) -> &str;

    fn config(&self) -> &AgentConfig;

    /// Build the system prompt for this turn
    fn generate_system_prompt(&self, ctx: &AgentContext) -> String;

    /// Process one guest message
    async fn handle_message(&self, message: &str, ctx: &AgentContext) -> AgentResponse;

    /// Tool schemas this agent exposes to the model
    fn tools(&self) -> Vec<ToolDefinition>;

    async fn health_check(&self, tenant: &TenantContext) -> HealthReport;

    fn stats(&self) -> AgentStats;
}

/// The four specialist roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    /// Sofia: new reservations
    Booking,
    /// Maya: changes to existing reservations
    Reservations,
    /// Apollo: alternatives after a failed availability check
    Availability,
    /// Conductor: small talk and hand-off once a task is done
    Conductor,
}

impl AgentType {
    pub const ALL: [AgentType; 4] = [
        AgentType::Booking,
        AgentType::Reservations,
        AgentType::Availability,
        AgentType::Conductor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Booking => "booking",
            AgentType::Reservations => "reservations",
            AgentType::Availability => "availability",
            AgentType::Conductor => "conductor",
        }
    }

    pub fn persona(&self) -> &'static str {
        match self {
            AgentType::Booking => "Sofia",
            AgentType::Reservations => "Maya",
            AgentType::Availability => "Apollo",
            AgentType::Conductor => "Conductor",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentType::Booking => "Guides guests from greeting to a confirmed new reservation",
            AgentType::Reservations => "Finds, modifies and cancels existing reservations",
            AgentType::Availability => "Finds and ranks alternative times when a slot is taken",
            AgentType::Conductor => "Handles thanks, simple questions and hand-offs after a task",
        }
    }

    pub fn capabilities(&self) -> Vec<String> {
        let caps: &[&str] = match self {
            AgentType::Booking => &["new_reservations", "availability_checking", "guest_personalization"],
            AgentType::Reservations => &["reservation_lookup", "modification", "cancellation"],
            AgentType::Availability => &["alternative_search", "preference_ranking"],
            AgentType::Conductor => &["small_talk", "restaurant_info", "handoff"],
        };
        caps.iter().map(|c| c.to_string()).collect()
    }
}

impl FromStr for AgentType {
    type Err = MaitreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "booking" | "sofia" => Ok(AgentType::Booking),
            "reservations" | "maya" => Ok(AgentType::Reservations),
            "availability" | "apollo" => Ok(AgentType::Availability),
            "conductor" => Ok(AgentType::Conductor),
            other => Err(MaitreError::validation(
                format!("Unknown agent type '{}'", other),
                "booking, reservations, availability or conductor",
            )),
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for one agent instance, fixed at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub primary_model: String,
    pub fallback_model: Option<String>,
    pub timeout: Duration,
    pub health_timeout: Duration,
    pub enable_context_resolution: bool,
    pub enable_translation: bool,
    pub enable_personalization: bool,
    pub max_clarification_attempts: u32,
}

impl AgentConfig {
    pub fn for_type(agent_type: AgentType, settings: &MaitreConfig) -> Self {
        let defaults = &settings.agents;
        // Modification answers should be literal
        let temperature = match agent_type {
            AgentType::Reservations => defaults.temperature.min(0.3),
            _ => defaults.temperature,
        };

        Self {
            name: agent_type.persona().to_string(),
            description: agent_type.description().to_string(),
            capabilities: agent_type.capabilities(),
            max_tokens: defaults.max_tokens,
            temperature,
            primary_model: settings.provider.primary_model.clone(),
            fallback_model: settings.provider.fallback_model.clone(),
            timeout: settings.provider.timeout(),
            health_timeout: settings.provider.health_timeout(),
            enable_context_resolution: defaults.enable_context_resolution,
            enable_translation: defaults.enable_translation,
            enable_personalization: defaults.enable_personalization,
            max_clarification_attempts: DEFAULT_MAX_CLARIFICATION_ATTEMPTS,
        }
    }

    pub fn generation_options(&self, label: &str) -> GenerationOptions {
        GenerationOptions {
            model: self.primary_model.clone(),
            fallback_model: self.fallback_model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            context_label: label.to_string(),
        }
    }
}

/// Per-tenant adjustments passed to the factory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOverrides {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub primary_model: Option<String>,
    pub enable_context_resolution: Option<bool>,
    pub enable_translation: Option<bool>,
    pub enable_personalization: Option<bool>,
}

impl AgentOverrides {
    pub fn apply(&self, config: &mut AgentConfig) {
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(model) = &self.primary_model {
            config.primary_model = model.clone();
        }
        if let Some(enabled) = self.enable_context_resolution {
            config.enable_context_resolution = enabled;
        }
        if let Some(enabled) = self.enable_translation {
            config.enable_translation = enabled;
        }
        if let Some(enabled) = self.enable_personalization {
            config.enable_personalization = enabled;
        }
    }
}

/// Everything an agent needs to know about the current message
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub restaurant_id: i64,
    pub timezone: String,
    pub language: Language,
    pub tenant: TenantContext,
    pub guest_history: Option<GuestHistory>,
    pub flags: ConversationFlags,
    pub gathering: GatheringInfo,
    pub state: ConversationState,
    pub session: Option<BookingSession>,
    /// Earlier turns of this conversation, oldest first
    pub history: Vec<ChatMessage>,
    /// Set when Apollo is called in after a failed availability check
    pub failure_context: Option<FailureContext>,
}

impl AgentContext {
    pub fn new(tenant: TenantContext, timezone: impl Into<String>, language: Language) -> Self {
        Self {
            restaurant_id: tenant.restaurant_id,
            timezone: timezone.into(),
            language,
            tenant,
            guest_history: None,
            flags: ConversationFlags::default(),
            gathering: GatheringInfo::default(),
            state: ConversationState::Idle,
            session: None,
            history: Vec::new(),
            failure_context: None,
        }
    }

    pub fn with_guest_history(mut self, history: GuestHistory) -> Self {
        self.guest_history = Some(history);
        self
    }

    pub fn with_state(mut self, state: ConversationState) -> Self {
        if let Some(slots) = state.slots() {
            self.gathering.merge(slots.clone());
        }
        self.state = state;
        self
    }

    pub fn with_session(mut self, session: BookingSession) -> Self {
        self.flags.merge(&session.flags);
        self.session = Some(session);
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_failure_context(mut self, failure: FailureContext) -> Self {
        self.failure_context = Some(failure);
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    /// Best identifier for looking up the guest's reservations
    pub fn guest_identifier(&self) -> Option<String> {
        self.guest_history
            .as_ref()
            .map(|h| h.guest_phone.clone())
            .or_else(|| self.gathering.phone.clone())
            .or_else(|| self.gathering.name.clone())
    }

    pub fn minimal(&self) -> MinimalContext {
        MinimalContext {
            restaurant_id: self.restaurant_id,
            timezone: self.timezone.clone(),
            session_id: self.session_id().map(str::to_string),
            language: self.language,
        }
    }
}

/// Request to continue the conversation with another agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    pub to: AgentType,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub agent_type: AgentType,
    pub processed_at: DateTime<Utc>,
    /// Notable branch taken, e.g. "name_resolved_by_fallback"
    pub decision: Option<String>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    pub recoverable: bool,
}

/// Uniform result of handling one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub requires_confirmation: bool,
    pub has_booking: bool,
    pub reservation_id: Option<i64>,
    pub next_state: Option<ConversationState>,
    pub handoff: Option<Handoff>,
    pub alternatives: Vec<RankedAlternative>,
    pub error: Option<AgentErrorInfo>,
    pub metadata: ResponseMetadata,
}

impl AgentResponse {
    pub fn new(agent_type: AgentType, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            requires_confirmation: false,
            has_booking: false,
            reservation_id: None,
            next_state: None,
            handoff: None,
            alternatives: Vec::new(),
            error: None,
            metadata: ResponseMetadata {
                agent_type,
                processed_at: Utc::now(),
                decision: None,
                confidence: None,
            },
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.has_booking = tool_calls
            .iter()
            .any(|c| c.name == maitre_tools::BookingTool::CreateReservation.name());
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_next_state(mut self, state: ConversationState) -> Self {
        self.next_state = Some(state);
        self
    }

    pub fn with_decision(mut self, decision: impl Into<String>) -> Self {
        self.metadata.decision = Some(decision.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.metadata.confidence = Some(confidence);
        self
    }

    pub fn with_handoff(mut self, to: AgentType, reason: impl Into<String>) -> Self {
        self.handoff = Some(Handoff {
            to,
            reason: reason.into(),
        });
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<RankedAlternative>) -> Self {
        self.alternatives = alternatives;
        self
    }

    pub fn with_reservation(mut self, reservation_id: i64) -> Self {
        self.reservation_id = Some(reservation_id);
        self
    }

    pub fn requiring_confirmation(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_aliases() {
        assert_eq!("sofia".parse::<AgentType>().unwrap(), AgentType::Booking);
        assert_eq!("Maya".parse::<AgentType>().unwrap(), AgentType::Reservations);
        assert_eq!("apollo".parse::<AgentType>().unwrap(), AgentType::Availability);
        assert_eq!("conductor".parse::<AgentType>().unwrap(), AgentType::Conductor);
        assert!("waiter".parse::<AgentType>().is_err());
    }

    #[test]
    fn test_config_from_settings_and_overrides() {
        let settings = MaitreConfig::default();
        let mut config = AgentConfig::for_type(AgentType::Reservations, &settings);
        assert_eq!(config.name, "Maya");
        assert!(config.temperature <= 0.3);

        AgentOverrides {
            max_tokens: Some(256),
            enable_translation: Some(false),
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(config.max_tokens, 256);
        assert!(!config.enable_translation);
        assert_eq!(config.generation_options("maya").max_tokens, 256);
    }

    #[test]
    fn test_has_booking_follows_create_call() {
        let response = AgentResponse::new(AgentType::Booking, "Booked").with_tool_calls(vec![
            ToolCall::new("create_reservation", serde_json::json!({})),
        ]);
        assert!(response.has_booking);

        let response = AgentResponse::new(AgentType::Booking, "Checking").with_tool_calls(vec![
            ToolCall::new("check_availability", serde_json::json!({})),
        ]);
        assert!(!response.has_booking);
    }
}

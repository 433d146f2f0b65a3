//! Maitre Framework - Unified framework re-exporting all Maitre components
//!
//! This meta-crate provides a single API surface over the individual
//! Maitre crates, for HTTP layers and drivers that embed the orchestrator.

pub use maitre_agents as agents;
pub use maitre_common as common;
pub use maitre_llm as llm;
pub use maitre_storage as storage;
pub use maitre_tools as tools;

// Re-export top-level types for convenience
pub use maitre_agents::{Agent, AgentFactory, AgentResponse, AgentServices, AgentType};
pub use maitre_common::{MaitreConfig, MaitreError, Result};

/// Convenience prelude module for common imports
pub mod prelude {
    // Common types and errors
    pub use maitre_common::{
        BookingRequest, ErrorKind, GuestHistory, Language, MaitreConfig, MaitreError, Result,
        RestaurantConfig, TenantContext, TenantPlan, TenantStatus,
    };

    // LLM provider contract
    pub use maitre_llm::{AiService, GenaiService, GenerationOptions, LlmTurn, ToolCall};

    // Tools
    pub use maitre_tools::{
        BookingTool, InMemoryReservationBook, ToolContext, ToolEnvelope, ToolExecutor,
    };

    // Storage and context
    pub use maitre_storage::{
        ContextManager, InMemoryContextManager, InMemoryRestaurantStore, RestaurantConfigManager,
        RestaurantStore,
    };

    // Agent system
    pub use maitre_agents::{
        Agent, AgentContext, AgentFactory, AgentOverrides, AgentResponse, AgentServices,
        AgentType, ConversationState, FailureContext, Handoff, HealthReport,
    };
}

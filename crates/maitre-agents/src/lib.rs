//! Maitre Agents - Conversational booking agents
//!
//! This crate provides the agent abstraction and its four specialists
//! (Sofia for new bookings, Maya for changes to existing ones, Apollo for
//! alternative times and the Conductor for everything after), the
//! heuristics they share and the tenant-scoped [`AgentFactory`].

pub mod agents;
pub mod alternatives;
pub mod factory;
pub mod health;
pub mod locale;
pub mod message_analysis;
pub mod name_resolution;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for convenience
pub use agents::{
    Agent, AgentConfig, AgentContext, AgentErrorInfo, AgentOverrides, AgentResponse, AgentStats,
    AgentType, ApolloAgent, BaseAgent, ConductorAgent, Handoff, MayaAgent, MessageKind,
    ResponseMetadata, SofiaAgent,
};
pub use alternatives::{RankedAlternative, TimePreference, rank_alternatives};
pub use factory::{AgentFactory, AgentServices, FactoryStats, TenantAgentUsage};
pub use health::HealthReport;
pub use message_analysis::{MessageAnalysis, MessageIntent, RequestedChanges, analyze_user_message};
pub use name_resolution::{MatchStage, NameResolution, resolve_pending_confirmation};
pub use state::{
    ConversationState, FailureContext, GatheringInfo, MinimalContext, PendingConfirmation,
};

//! LLM integration for Maitre
//!
//! This crate defines the contract the agents expect from an LLM provider
//! ([`AiService`]) and ships a `genai`-backed implementation with timeouts,
//! model fallback and per-tenant request quotas.

pub mod genai_service;
pub mod json;
pub mod llm;
pub mod tools;

// Re-export key types for convenience
pub use genai_service::{GenaiService, QuotaPolicy};
pub use json::extract_json;
pub use llm::{AiService, ChatMessage, ChatTurnRequest, GenerationOptions, LlmTurn, ToolCall};
pub use tools::ToolDefinition;

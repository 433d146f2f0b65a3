//! Maitre Storage - Restaurant configuration and conversation context
//!
//! This crate provides the [`RestaurantStore`] trait with an in-memory
//! implementation, the caching [`RestaurantConfigManager`], the
//! [`ContextManager`] collaborator used to infer which reservation a guest
//! means, and the booking session snapshot it operates on.

pub mod config_manager;
pub mod context;
pub mod session;
pub mod store;

// Re-export key types for convenience
pub use config_manager::RestaurantConfigManager;
pub use context::{Confidence, ContextManager, ContextResolution, InMemoryContextManager};
pub use session::{BookingSession, ConversationFlags};
pub use store::{InMemoryRestaurantStore, RestaurantRow, RestaurantStore};

//! Maitre Tools - Booking tool registry
//!
//! This crate provides the declarative list of functions the model may call
//! (`check_availability`, `create_reservation`, ...), the tagged envelope
//! every tool backend answers with, the [`ToolExecutor`] collaborator trait
//! and an in-memory reservation book implementing it.

pub mod envelope;
pub mod executor;
pub mod memory_book;
pub mod registry;

// Re-export key types for convenience
pub use envelope::{ToolEnvelope, ToolFailure, ToolStatus};
pub use executor::{ToolContext, ToolExecutor};
pub use memory_book::InMemoryReservationBook;
pub use registry::{BookingTool, agent_tools, tools_for};

//! Maitre Common - Shared errors, configuration and domain types
//!
//! This crate provides the error taxonomy, configuration structs,
//! restaurant/tenant types and time utilities used across all Maitre crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::{AgentDefaults, FactoryConfig, MaitreConfig, ProviderConfig};
pub use constants::*;
pub use error::{ErrorKind, MaitreError, Result};
pub use types::{
    BookingRequest, GuestHistory, Language, ReservationStatus, ReservationSummary,
    RestaurantConfig, TenantContext, TenantPlan, TenantStatus,
};
pub use utils::*;

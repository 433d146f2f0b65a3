//! Common constants used across Maitre

/// Restaurant timezone used when the stored row has none
pub const DEFAULT_TIMEZONE: &str = "Europe/Belgrade";

/// Default operating hours
pub const DEFAULT_OPENING_TIME: &str = "09:00";
pub const DEFAULT_CLOSING_TIME: &str = "23:00";

/// Default maximum party size
pub const DEFAULT_MAX_GUESTS: u32 = 12;

/// Average time a table is occupied, in minutes
pub const DEFAULT_RESERVATION_DURATION_MINUTES: u32 = 120;

/// Clarification replies accepted before falling back to the requested name
pub const DEFAULT_MAX_CLARIFICATION_ATTEMPTS: u32 = 3;

/// Edit distance accepted by fuzzy name matching
pub const FUZZY_NAME_MAX_DISTANCE: usize = 2;

/// Number of alternative slots shown to a guest
pub const MAX_PRESENTED_ALTERNATIVES: usize = 3;

/// Common model identifiers
pub mod models {
    pub const CLAUDE_SONNET: &str = "claude-3-5-sonnet-latest";
    pub const CLAUDE_HAIKU: &str = "claude-3-5-haiku-latest";
    pub const GPT_4O: &str = "gpt-4o";
    pub const GPT_4O_MINI: &str = "gpt-4o-mini";
}

/// Default timeout values in seconds
pub mod timeouts {
    pub const DEFAULT_LLM_TIMEOUT: u64 = 30;
    pub const HEALTH_PROBE_TIMEOUT: u64 = 5;
}

/// Agent factory defaults
pub mod factory {
    pub const DEFAULT_MAX_CACHE_SIZE: usize = 100;
    pub const DEFAULT_STALE_AFTER_MINUTES: u64 = 30;
    pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 300;
}

/// Tenant feature flag names
pub mod features {
    pub const ADVANCED_AVAILABILITY: &str = "advanced_availability";
    pub const GUEST_HISTORY: &str = "guest_history";
    pub const MULTI_LANGUAGE: &str = "multi_language";
}

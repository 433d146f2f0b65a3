//! Configuration types and utilities for Maitre

use crate::constants::{factory, models, timeouts, DEFAULT_RESERVATION_DURATION_MINUTES};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration, usually read from `maitre.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaitreConfig {
    pub provider: ProviderConfig,
    pub agents: AgentDefaults,
    pub factory: FactoryConfig,
}

impl MaitreConfig {
    /// Parse configuration from a TOML string; missing sections fall back to defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Read configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

/// Provider configuration for LLM services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Model used for every agent call
    pub primary_model: String,
    /// Model used when the primary one fails
    pub fallback_model: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Timeout for health probes in seconds
    pub health_timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            primary_model: models::CLAUDE_SONNET.to_string(),
            fallback_model: Some(models::GPT_4O_MINI.to_string()),
            timeout_seconds: timeouts::DEFAULT_LLM_TIMEOUT,
            health_timeout_seconds: timeouts::HEALTH_PROBE_TIMEOUT,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_seconds)
    }
}

/// Defaults applied to every agent instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    pub max_tokens: u32,
    pub temperature: f64,
    pub enable_context_resolution: bool,
    pub enable_translation: bool,
    pub enable_personalization: bool,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
            enable_context_resolution: true,
            enable_translation: true,
            enable_personalization: true,
        }
    }
}

/// Agent factory tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub cache_enabled: bool,
    pub max_cache_size: usize,
    pub stale_after_minutes: u64,
    pub health_check_interval_seconds: u64,
    pub reservation_duration_minutes: u32,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            max_cache_size: factory::DEFAULT_MAX_CACHE_SIZE,
            stale_after_minutes: factory::DEFAULT_STALE_AFTER_MINUTES,
            health_check_interval_seconds: factory::DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            reservation_duration_minutes: DEFAULT_RESERVATION_DURATION_MINUTES,
        }
    }
}

impl FactoryConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_minutes * 60)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MaitreConfig::from_toml_str(
            r#"
            [provider]
            primary_model = "gpt-4o"

            [factory]
            max_cache_size = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.provider.primary_model, "gpt-4o");
        assert_eq!(config.provider.timeout_seconds, 30);
        assert_eq!(config.factory.max_cache_size, 2);
        assert!(config.factory.cache_enabled);
        assert!(config.agents.enable_translation);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agents]\ntemperature = 0.2\nenable_translation = false").unwrap();

        let config = MaitreConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.agents.temperature, 0.2);
        assert!(!config.agents.enable_translation);
        assert_eq!(config.factory.stale_after(), Duration::from_secs(1800));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = MaitreConfig::from_toml_str("provider = [").unwrap_err();
        assert!(matches!(err, crate::MaitreError::Config(_)));
    }
}

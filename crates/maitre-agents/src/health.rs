//! Agent health reports and the background monitor that collects them

use crate::factory::AgentFactory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Result of probing one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// True iff every check passed
    pub healthy: bool,
    pub checks: BTreeMap<String, bool>,
    pub details: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn new() -> Self {
        Self {
            healthy: true,
            checks: BTreeMap::new(),
            details: Vec::new(),
            checked_at: Utc::now(),
        }
    }

    pub fn record(&mut self, check: &str, passed: bool, detail: impl Into<String>) {
        self.checks.insert(check.to_string(), passed);
        self.details.push(format!("{}: {}", check, detail.into()));
        self.healthy = self.checks.values().all(|ok| *ok);
    }

    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl Default for HealthReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Probe cached agents and sweep stale entries on a fixed interval
///
/// The task holds only a weak reference, so dropping the factory ends it.
pub(crate) fn spawn_health_monitor(factory: Weak<AgentFactory>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(factory) = factory.upgrade() else {
                debug!("Agent factory dropped, stopping health monitor");
                break;
            };

            let unhealthy = factory.run_health_checks().await;
            let swept = factory.sweep_stale().await;
            if unhealthy > 0 || swept > 0 {
                info!(
                    event = "health_sweep",
                    unhealthy,
                    swept,
                    "Health monitor evicted agents"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_is_healthy_only_when_all_pass() {
        let mut report = HealthReport::new();
        report.record("llm", true, "responded");
        assert!(report.healthy);

        report.record("tools", false, "missing create_reservation");
        assert!(!report.healthy);
        assert_eq!(report.failed_checks(), vec!["tools"]);
        assert_eq!(report.details.len(), 2);
    }
}

//! Tenant-scoped agent factory
//!
//! One factory is constructed at startup and shared by reference. It checks
//! tenant status and plan entitlements, caches one agent per
//! `(tenant, agent type)`, evicts least-recently-used entries past the cache
//! limit and keeps per-tenant usage counters for billing.

use crate::agents::{
    Agent, AgentConfig, AgentOverrides, AgentType, ApolloAgent, ConductorAgent, MayaAgent,
    SofiaAgent,
};
use crate::health::spawn_health_monitor;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use maitre_common::{MaitreConfig, MaitreError, Result, TenantContext, TenantPlan, features};
use maitre_llm::AiService;
use maitre_storage::{ContextManager, RestaurantConfigManager};
use maitre_tools::ToolExecutor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// External collaborators every agent is built with
#[derive(Clone)]
pub struct AgentServices {
    pub llm: Arc<dyn AiService>,
    pub context: Arc<dyn ContextManager>,
    pub executor: Arc<dyn ToolExecutor>,
}

/// Plan and feature requirements of one agent type
struct Entitlement {
    min_plan: TenantPlan,
    features: &'static [&'static str],
}

fn entitlement(agent_type: AgentType) -> Entitlement {
    match agent_type {
        AgentType::Booking | AgentType::Reservations => Entitlement {
            min_plan: TenantPlan::Starter,
            features: &[],
        },
        AgentType::Availability => Entitlement {
            min_plan: TenantPlan::Professional,
            features: &[features::ADVANCED_AVAILABILITY],
        },
        AgentType::Conductor => Entitlement {
            min_plan: TenantPlan::Professional,
            features: &[],
        },
    }
}

fn validate_tenant(agent_type: AgentType, tenant: &TenantContext) -> Result<()> {
    if !tenant.tenant_status.is_serving() {
        return Err(MaitreError::TenantInactive {
            tenant_id: tenant.tenant_id(),
            status: tenant.tenant_status.to_string(),
        });
    }

    let required = entitlement(agent_type);
    let missing: Vec<&str> = required
        .features
        .iter()
        .copied()
        .filter(|f| !tenant.has_feature(f))
        .collect();

    if tenant.tenant_plan < required.min_plan || !missing.is_empty() {
        let mut requirement = format!("the {} plan or higher", required.min_plan);
        if !required.features.is_empty() {
            requirement.push_str(&format!(" with {} enabled", required.features.join(", ")));
        }
        return Err(MaitreError::Entitlement {
            agent_type: agent_type.to_string(),
            current_plan: tenant.tenant_plan.to_string(),
            requirement,
        });
    }

    Ok(())
}

/// Tenant state captured when an entry was created
#[derive(Debug, Clone)]
struct SecuritySnapshot {
    created_by: String,
    plan: TenantPlan,
    features: Vec<String>,
    validated_at: DateTime<Utc>,
}

struct AgentRegistryEntry {
    agent: Arc<dyn Agent>,
    agent_type: AgentType,
    tenant_id: String,
    tenant: TenantContext,
    created_at: DateTime<Utc>,
    last_used: Instant,
    /// Monotonic use order for LRU eviction
    last_used_seq: u64,
    request_count: u64,
    healthy: bool,
    security: SecuritySnapshot,
}

type RegistryKey = (String, AgentType);

/// Billing counters for one tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantAgentUsage {
    /// Calendar month the monthly counters belong to, `YYYY-MM`
    pub month: String,
    pub monthly_creations: u64,
    pub lifetime_creations: u64,
    pub by_type: BTreeMap<AgentType, u64>,
    pub last_created_at: Option<DateTime<Utc>>,
}

impl TenantAgentUsage {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            month: now.format("%Y-%m").to_string(),
            monthly_creations: 0,
            lifetime_creations: 0,
            by_type: BTreeMap::new(),
            last_created_at: None,
        }
    }

    fn record(&mut self, agent_type: AgentType, now: DateTime<Utc>) {
        let month = now.format("%Y-%m").to_string();
        if month != self.month {
            self.month = month;
            self.monthly_creations = 0;
            self.by_type.clear();
        }
        self.monthly_creations += 1;
        self.lifetime_creations += 1;
        *self.by_type.entry(agent_type).or_insert(0) += 1;
        self.last_created_at = Some(now);
    }
}

/// Point-in-time view of the agent cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryStats {
    pub cached_agents: usize,
    pub healthy_agents: usize,
    pub by_type: BTreeMap<AgentType, usize>,
    pub tenants: usize,
    pub total_created: u64,
    pub cache_hits: u64,
    pub evictions: u64,
}

/// Creates, caches and health-checks agents per tenant
pub struct AgentFactory {
    settings: MaitreConfig,
    configs: Arc<RestaurantConfigManager>,
    services: AgentServices,
    registry: RwLock<HashMap<RegistryKey, AgentRegistryEntry>>,
    usage: RwLock<HashMap<String, TenantAgentUsage>>,
    use_seq: AtomicU64,
    total_created: AtomicU64,
    cache_hits: AtomicU64,
    evictions: AtomicU64,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl AgentFactory {
    pub fn new(
        settings: MaitreConfig,
        configs: Arc<RestaurantConfigManager>,
        services: AgentServices,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            configs,
            services,
            registry: RwLock::new(HashMap::new()),
            usage: RwLock::new(HashMap::new()),
            use_seq: AtomicU64::new(0),
            total_created: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            monitor: Mutex::new(None),
        })
    }

    /// Return a cached agent for this tenant or build a new one
    ///
    /// Tenant status and entitlements are checked on every call, cache hit or
    /// not. Requests with overrides always get a fresh, uncached agent.
    pub async fn create_agent(
        &self,
        agent_type: AgentType,
        tenant: &TenantContext,
        overrides: Option<AgentOverrides>,
    ) -> Result<Arc<dyn Agent>> {
        if let Err(e) = validate_tenant(agent_type, tenant) {
            warn!(
                tenant_id = %tenant.tenant_id(),
                agent_type = %agent_type,
                error = %e,
                "Agent creation refused"
            );
            return Err(e);
        }

        let key = (tenant.tenant_id(), agent_type);
        let cacheable = self.settings.factory.cache_enabled && overrides.is_none();

        if cacheable {
            if let Some(agent) = self.cache_hit(&key, tenant).await {
                return Ok(agent);
            }
        }

        let restaurant = self.configs.get_config(tenant.restaurant_id).await?;
        let mut config = AgentConfig::for_type(agent_type, &self.settings);
        if let Some(overrides) = &overrides {
            overrides.apply(&mut config);
        }

        let services = self.services.clone();
        let agent: Arc<dyn Agent> = match agent_type {
            AgentType::Booking => Arc::new(SofiaAgent::new(config, restaurant, services)),
            AgentType::Reservations => Arc::new(MayaAgent::new(config, restaurant, services)),
            AgentType::Availability => Arc::new(ApolloAgent::new(config, restaurant, services)),
            AgentType::Conductor => Arc::new(ConductorAgent::new(config, restaurant, services)),
        };

        if cacheable {
            let entry = AgentRegistryEntry {
                agent: agent.clone(),
                agent_type,
                tenant_id: key.0.clone(),
                tenant: tenant.clone(),
                created_at: Utc::now(),
                last_used: Instant::now(),
                last_used_seq: self.next_seq(),
                request_count: 1,
                healthy: true,
                security: SecuritySnapshot {
                    created_by: format!("factory:{}", tenant.restaurant_name),
                    plan: tenant.tenant_plan,
                    features: tenant.enabled_features(),
                    validated_at: Utc::now(),
                },
            };
            let mut registry = self.registry.write().await;
            registry.insert(key, entry);
            self.evict_lru(&mut registry);
        }

        self.total_created.fetch_add(1, Ordering::Relaxed);
        self.record_usage(tenant, agent_type).await;

        info!(
            event = "agent_created",
            tenant_id = %tenant.tenant_id(),
            agent_type = %agent_type,
            agent_name = agent.name(),
            cached = cacheable,
            "Created agent"
        );
        Ok(agent)
    }

    async fn cache_hit(&self, key: &RegistryKey, tenant: &TenantContext) -> Option<Arc<dyn Agent>> {
        let mut registry = self.registry.write().await;
        let entry = registry.get_mut(key)?;
        if !entry.healthy {
            debug!(tenant_id = %key.0, agent_type = %key.1, "Dropping unhealthy cached agent");
            registry.remove(key);
            return None;
        }

        entry.last_used = Instant::now();
        entry.last_used_seq = self.next_seq();
        entry.request_count += 1;
        entry.tenant = tenant.clone();
        entry.security.plan = tenant.tenant_plan;
        entry.security.features = tenant.enabled_features();
        entry.security.validated_at = Utc::now();
        self.cache_hits.fetch_add(1, Ordering::Relaxed);

        info!(
            event = "agent_cache_hit",
            tenant_id = %entry.tenant_id,
            agent_type = %entry.agent_type,
            requests = entry.request_count,
            created_by = %entry.security.created_by,
            "Reusing cached agent"
        );
        Some(entry.agent.clone())
    }

    fn next_seq(&self) -> u64 {
        self.use_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn evict_lru(&self, registry: &mut HashMap<RegistryKey, AgentRegistryEntry>) {
        while registry.len() > self.settings.factory.max_cache_size {
            let Some(oldest) = registry
                .iter()
                .min_by_key(|(_, entry)| entry.last_used_seq)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            if let Some(entry) = registry.remove(&oldest) {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                info!(
                    event = "agent_evicted",
                    tenant_id = %entry.tenant_id,
                    agent_type = %entry.agent_type,
                    age_secs = (Utc::now() - entry.created_at).num_seconds(),
                    plan = %entry.security.plan,
                    features = ?entry.security.features,
                    validated_at = %entry.security.validated_at,
                    "Evicted least recently used agent"
                );
            }
        }
    }

    async fn record_usage(&self, tenant: &TenantContext, agent_type: AgentType) {
        let now = Utc::now();
        let mut usage = self.usage.write().await;
        usage
            .entry(tenant.tenant_id())
            .or_insert_with(|| TenantAgentUsage::new(now))
            .record(agent_type, now);
    }

    /// Evict every cached agent of a tenant and drop its restaurant config
    pub async fn invalidate_tenant_agents(&self, tenant_id: &str) -> usize {
        let removed = {
            let mut registry = self.registry.write().await;
            let before = registry.len();
            registry.retain(|(owner, _), _| owner != tenant_id);
            before - registry.len()
        };

        match tenant_id.parse::<i64>() {
            Ok(restaurant_id) => self.configs.clear_config_cache(restaurant_id).await,
            Err(_) => warn!(tenant_id, "Tenant id is not a restaurant id, config cache kept"),
        }

        info!(
            event = "tenant_agents_invalidated",
            tenant_id,
            removed,
            "Invalidated tenant agents"
        );
        removed
    }

    pub async fn usage_for(&self, tenant_id: &str) -> Option<TenantAgentUsage> {
        self.usage.read().await.get(tenant_id).cloned()
    }

    pub async fn stats(&self) -> FactoryStats {
        let registry = self.registry.read().await;
        let mut by_type = BTreeMap::new();
        for entry in registry.values() {
            *by_type.entry(entry.agent_type).or_insert(0) += 1;
        }
        let mut tenants: Vec<&str> = registry.keys().map(|(t, _)| t.as_str()).collect();
        tenants.sort_unstable();
        tenants.dedup();

        FactoryStats {
            cached_agents: registry.len(),
            healthy_agents: registry.values().filter(|e| e.healthy).count(),
            by_type,
            tenants: tenants.len(),
            total_created: self.total_created.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Probe every cached agent and mark the ones that fail
    ///
    /// Unhealthy agents are never handed out again; the next request or
    /// sweep replaces them. Probes run concurrently without holding the
    /// registry lock.
    pub async fn run_health_checks(&self) -> usize {
        let probes: Vec<(RegistryKey, Arc<dyn Agent>, TenantContext)> = {
            let registry = self.registry.read().await;
            registry
                .iter()
                .map(|(key, entry)| (key.clone(), entry.agent.clone(), entry.tenant.clone()))
                .collect()
        };

        let reports = join_all(probes.iter().map(|(_, agent, tenant)| agent.health_check(tenant))).await;

        let mut unhealthy = Vec::new();
        for ((key, _, _), report) in probes.into_iter().zip(reports) {
            if !report.healthy {
                warn!(
                    tenant_id = %key.0,
                    agent_type = %key.1,
                    failed = ?report.failed_checks(),
                    "Agent failed health check"
                );
                unhealthy.push(key);
            }
        }

        let mut registry = self.registry.write().await;
        for key in &unhealthy {
            if let Some(entry) = registry.get_mut(key) {
                entry.healthy = false;
            }
        }
        unhealthy.len()
    }

    /// Evict unhealthy agents and those idle past the staleness window
    pub async fn sweep_stale(&self) -> usize {
        let stale_after = self.settings.factory.stale_after();
        let mut registry = self.registry.write().await;
        let before = registry.len();
        registry.retain(|_, entry| entry.healthy && entry.last_used.elapsed() < stale_after);
        let swept = before - registry.len();
        if swept > 0 {
            debug!(swept, "Swept stale agents");
        }
        swept
    }

    /// Start the periodic health monitor; calling it again is a no-op
    pub fn start_health_monitor(self: &Arc<Self>) {
        let Ok(mut monitor) = self.monitor.lock() else {
            warn!("Health monitor lock poisoned, monitor not started");
            return;
        };
        if monitor.is_some() {
            return;
        }
        let period = self.settings.factory.health_check_interval();
        *monitor = Some(spawn_health_monitor(Arc::downgrade(self), period));
        info!(interval_secs = period.as_secs(), "Started agent health monitor");
    }

    pub fn shutdown(&self) {
        if let Ok(mut monitor) = self.monitor.lock() {
            if let Some(handle) = monitor.take() {
                handle.abort();
                info!("Stopped agent health monitor");
            }
        }
    }
}

impl Drop for AgentFactory {
    fn drop(&mut self) {
        self.shutdown();
    }
}

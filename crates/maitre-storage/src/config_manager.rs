//! Cached per-restaurant configuration

use crate::store::{RestaurantRow, RestaurantStore};
use maitre_common::{
    DEFAULT_CLOSING_TIME, DEFAULT_MAX_GUESTS, DEFAULT_OPENING_TIME,
    DEFAULT_RESERVATION_DURATION_MINUTES, DEFAULT_TIMEZONE, MaitreError, RestaurantConfig,
    Result, parse_time,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Loads restaurant rows, fills in defaults and keeps the result cached.
///
/// Configuration is read-mostly, so a plain map behind a lock is enough;
/// callers invalidate an entry with [`clear_config_cache`](Self::clear_config_cache)
/// when a tenant changes its settings.
pub struct RestaurantConfigManager {
    store: Arc<dyn RestaurantStore>,
    cache: RwLock<HashMap<i64, Arc<RestaurantConfig>>>,
}

impl RestaurantConfigManager {
    pub fn new(store: Arc<dyn RestaurantStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_config(&self, restaurant_id: i64) -> Result<Arc<RestaurantConfig>> {
        if let Some(config) = self.cache.read().await.get(&restaurant_id) {
            debug!(restaurant_id, "Restaurant config cache hit");
            return Ok(Arc::clone(config));
        }

        let row = self
            .store
            .get_restaurant(restaurant_id)
            .await?
            .ok_or_else(|| MaitreError::NotFound(format!("Restaurant {}", restaurant_id)))?;

        let config = Arc::new(normalize(row));
        self.cache
            .write()
            .await
            .insert(restaurant_id, Arc::clone(&config));

        info!(
            restaurant_id,
            timezone = %config.timezone,
            "Loaded restaurant config"
        );
        Ok(config)
    }

    pub async fn clear_config_cache(&self, restaurant_id: i64) {
        if self.cache.write().await.remove(&restaurant_id).is_some() {
            info!(event = "restaurant_config_invalidated", restaurant_id, "Cleared restaurant config");
        }
    }

    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }
}

/// Apply defaults to a raw row
fn normalize(row: RestaurantRow) -> RestaurantConfig {
    let restaurant_id = row.id;
    let time_or_default = |value: Option<String>, default: &str, field: &str| match value {
        Some(v) if parse_time(&v).is_some() => v,
        Some(v) => {
            warn!(restaurant_id, field, value = %v, "Unparseable time, using default");
            default.to_string()
        }
        None => default.to_string(),
    };

    RestaurantConfig {
        id: row.id,
        timezone: row
            .timezone
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
        opening_time: time_or_default(row.opening_time, DEFAULT_OPENING_TIME, "opening_time"),
        closing_time: time_or_default(row.closing_time, DEFAULT_CLOSING_TIME, "closing_time"),
        max_guests: row.max_guests.unwrap_or(DEFAULT_MAX_GUESTS),
        avg_reservation_duration: row
            .avg_reservation_duration
            .unwrap_or(DEFAULT_RESERVATION_DURATION_MINUTES),
        cuisine: row.cuisine,
        atmosphere: row.atmosphere,
        country: row.country,
        languages: row.languages.unwrap_or_default(),
        phone: row.phone,
        address: row.address,
        name: row.name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRestaurantStore;

    fn manager() -> (Arc<InMemoryRestaurantStore>, RestaurantConfigManager) {
        let store = Arc::new(InMemoryRestaurantStore::with_rows([RestaurantRow {
            id: 1,
            name: "Demo".into(),
            ..Default::default()
        }]));
        let manager = RestaurantConfigManager::new(store.clone());
        (store, manager)
    }

    #[tokio::test]
    async fn test_defaults_applied() {
        let (_, manager) = manager();
        let config = manager.get_config(1).await.unwrap();
        assert_eq!(config.timezone, "Europe/Belgrade");
        assert_eq!(config.opening_time, "09:00");
        assert_eq!(config.closing_time, "23:00");
        assert_eq!(config.max_guests, 12);
        assert_eq!(config.avg_reservation_duration, 120);
    }

    #[tokio::test]
    async fn test_cache_returns_same_instance() {
        let (store, manager) = manager();
        let first = manager.get_config(1).await.unwrap();
        let second = manager.get_config(1).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetch_count(), 1);

        manager.clear_config_cache(1).await;
        let third = manager.get_config(1).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_restaurant_is_not_found() {
        let (_, manager) = manager();
        let err = manager.get_config(99).await.unwrap_err();
        assert!(matches!(err, MaitreError::NotFound(_)));
        assert_eq!(manager.cached_count().await, 0);
    }

    #[tokio::test]
    async fn test_bad_time_falls_back() {
        let store = Arc::new(InMemoryRestaurantStore::with_rows([RestaurantRow {
            id: 2,
            name: "Late".into(),
            opening_time: Some("noon".into()),
            closing_time: Some("02:00".into()),
            ..Default::default()
        }]));
        let manager = RestaurantConfigManager::new(store);
        let config = manager.get_config(2).await.unwrap();
        assert_eq!(config.opening_time, "09:00");
        assert!(config.is_overnight());
    }
}

//! Restaurant rows as they come out of storage

use async_trait::async_trait;
use maitre_common::{MaitreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Raw restaurant record; older rows use camelCase column names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRow {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, alias = "openingTime")]
    pub opening_time: Option<String>,
    #[serde(default, alias = "closingTime")]
    pub closing_time: Option<String>,
    #[serde(default, alias = "maxGuests", alias = "max_guests_per_reservation")]
    pub max_guests: Option<u32>,
    #[serde(default, alias = "avgReservationDuration")]
    pub avg_reservation_duration: Option<u32>,
    #[serde(default, alias = "cuisineType")]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub atmosphere: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Read access to restaurant rows
#[async_trait]
pub trait RestaurantStore: Send + Sync {
    async fn get_restaurant(&self, id: i64) -> Result<Option<RestaurantRow>>;
}

/// Restaurant store backed by a map, loadable from a JSON fixture
#[derive(Default)]
pub struct InMemoryRestaurantStore {
    rows: RwLock<HashMap<i64, RestaurantRow>>,
    fetches: AtomicUsize,
}

impl InMemoryRestaurantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = RestaurantRow>) -> Self {
        Self {
            rows: RwLock::new(rows.into_iter().map(|row| (row.id, row)).collect()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Parse a JSON array of restaurant rows
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let rows: Vec<RestaurantRow> = serde_json::from_str(raw)?;
        debug!(count = rows.len(), "Loaded restaurant rows");
        Ok(Self::with_rows(rows))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MaitreError::Storage(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub async fn upsert(&self, row: RestaurantRow) {
        self.rows.write().await.insert(row.id, row);
    }

    /// Number of `get_restaurant` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RestaurantStore for InMemoryRestaurantStore {
    async fn get_restaurant(&self, id: i64) -> Result<Option<RestaurantRow>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        Ok(self.rows.read().await.get(&id).cloned())
    }
}

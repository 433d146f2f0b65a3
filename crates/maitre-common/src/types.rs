//! Common types used across Maitre components

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conversation language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
    Sr,
    Hu,
    De,
    Fr,
    Es,
    It,
    Pt,
    Nl,
    /// Not yet detected
    Auto,
}

impl Language {
    /// Every concrete language, in table order
    pub const SUPPORTED: [Language; 10] = [
        Language::En,
        Language::Ru,
        Language::Sr,
        Language::Hu,
        Language::De,
        Language::Fr,
        Language::Es,
        Language::It,
        Language::Pt,
        Language::Nl,
    ];

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
            Language::Sr => "sr",
            Language::Hu => "hu",
            Language::De => "de",
            Language::Fr => "fr",
            Language::Es => "es",
            Language::It => "it",
            Language::Pt => "pt",
            Language::Nl => "nl",
            Language::Auto => "auto",
        }
    }

    /// English name of the language, used inside prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ru => "Russian",
            Language::Sr => "Serbian",
            Language::Hu => "Hungarian",
            Language::De => "German",
            Language::Fr => "French",
            Language::Es => "Spanish",
            Language::It => "Italian",
            Language::Pt => "Portuguese",
            Language::Nl => "Dutch",
            Language::Auto => "the guest's language",
        }
    }

    /// Parse a language code such as `"ru"` or `"pt-BR"`
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.split(['-', '_']).next()?.to_lowercase();
        match primary.as_str() {
            "en" => Some(Language::En),
            "ru" => Some(Language::Ru),
            "sr" => Some(Language::Sr),
            "hu" => Some(Language::Hu),
            "de" => Some(Language::De),
            "fr" => Some(Language::Fr),
            "es" => Some(Language::Es),
            "it" => Some(Language::It),
            "pt" => Some(Language::Pt),
            "nl" => Some(Language::Nl),
            "auto" => Some(Language::Auto),
            _ => None,
        }
    }

    /// English and "auto" never need translation
    pub fn needs_translation(&self) -> bool {
        !matches!(self, Language::En | Language::Auto)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Tenant account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Trial,
    Suspended,
}

impl TenantStatus {
    /// Only active and trial tenants are served by agents
    pub fn is_serving(&self) -> bool {
        matches!(self, TenantStatus::Active | TenantStatus::Trial)
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantStatus::Active => write!(f, "active"),
            TenantStatus::Trial => write!(f, "trial"),
            TenantStatus::Suspended => write!(f, "suspended"),
        }
    }
}

/// Subscription plan, ordered from cheapest to most complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantPlan {
    Starter,
    Professional,
    Enterprise,
}

impl TenantPlan {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "starter" => Some(TenantPlan::Starter),
            "professional" | "pro" => Some(TenantPlan::Professional),
            "enterprise" => Some(TenantPlan::Enterprise),
            _ => None,
        }
    }
}

impl std::fmt::Display for TenantPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantPlan::Starter => write!(f, "starter"),
            TenantPlan::Professional => write!(f, "professional"),
            TenantPlan::Enterprise => write!(f, "enterprise"),
        }
    }
}

/// Tenant-plan state of a restaurant account, supplied by the caller on every operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantContext {
    pub restaurant_id: i64,
    pub restaurant_name: String,
    pub tenant_status: TenantStatus,
    pub tenant_plan: TenantPlan,
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}

impl TenantContext {
    pub fn new(
        restaurant_id: i64,
        restaurant_name: impl Into<String>,
        tenant_status: TenantStatus,
        tenant_plan: TenantPlan,
    ) -> Self {
        Self {
            restaurant_id,
            restaurant_name: restaurant_name.into(),
            tenant_status,
            tenant_plan,
            features: BTreeMap::new(),
        }
    }

    /// Builder-style feature toggle
    pub fn with_feature(mut self, feature: impl Into<String>, enabled: bool) -> Self {
        self.features.insert(feature.into(), enabled);
        self
    }

    /// Tenants are restaurant accounts
    pub fn tenant_id(&self) -> String {
        self.restaurant_id.to_string()
    }

    /// Missing flags count as disabled
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.get(feature).copied().unwrap_or(false)
    }

    pub fn enabled_features(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Per-restaurant configuration, normalised and defaulted by the config manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantConfig {
    pub id: i64,
    pub name: String,
    pub timezone: String,
    /// `HH:MM`
    pub opening_time: String,
    /// `HH:MM`
    pub closing_time: String,
    pub max_guests: u32,
    pub avg_reservation_duration: u32,
    pub cuisine: Option<String>,
    pub atmosphere: Option<String>,
    pub country: Option<String>,
    pub languages: Vec<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl RestaurantConfig {
    pub fn opening(&self) -> Option<NaiveTime> {
        crate::utils::parse_time(&self.opening_time)
    }

    pub fn closing(&self) -> Option<NaiveTime> {
        crate::utils::parse_time(&self.closing_time)
    }

    /// Closing before opening means the restaurant operates past midnight
    pub fn is_overnight(&self) -> bool {
        match (self.opening(), self.closing()) {
            (Some(open), Some(close)) => close <= open,
            _ => false,
        }
    }

    /// Whether `time` falls inside opening hours, counting times past midnight
    /// for overnight restaurants
    pub fn is_open_at(&self, time: NaiveTime) -> bool {
        match (self.opening(), self.closing()) {
            (Some(open), Some(close)) if close <= open => time >= open || time < close,
            (Some(open), Some(close)) => time >= open && time < close,
            _ => false,
        }
    }

    /// Latest time a reservation can start and still finish before closing
    pub fn last_bookable_time(&self) -> Option<NaiveTime> {
        self.closing()
            .map(|close| crate::utils::subtract_minutes(close, self.avg_reservation_duration))
    }
}

/// Aggregated booking history of a returning guest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestHistory {
    pub guest_name: String,
    pub guest_phone: String,
    pub total_bookings: u32,
    pub total_cancellations: u32,
    pub last_visit_date: Option<String>,
    pub common_party_size: Option<u32>,
    #[serde(default)]
    pub frequent_special_requests: Vec<String>,
    pub retrieved_at: DateTime<Utc>,
}

impl GuestHistory {
    /// Three or more bookings make a regular
    pub fn is_regular(&self) -> bool {
        self.total_bookings >= 3
    }
}

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Created,
    Confirmed,
    Canceled,
    Completed,
    Archived,
}

impl ReservationStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ReservationStatus::Created | ReservationStatus::Confirmed)
    }
}

/// An existing reservation as returned by `find_existing_reservation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSummary {
    pub id: i64,
    pub guest_name: String,
    pub guest_phone: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub guests: u32,
    pub status: ReservationStatus,
    pub special_requests: Option<String>,
    pub table_name: Option<String>,
}

/// A fully specified booking, as confirmed by the guest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub guest_name: String,
    pub guest_phone: String,
    pub date: String,
    pub time: String,
    pub guests: u32,
    pub special_requests: Option<String>,
}

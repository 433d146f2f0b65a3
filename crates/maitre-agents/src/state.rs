//! Conversation state carried by the caller between turns

use maitre_common::{BookingRequest, Language};
use serde::{Deserialize, Serialize};

/// The only context a pending confirmation keeps across turns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimalContext {
    pub restaurant_id: i64,
    pub timezone: String,
    pub session_id: Option<String>,
    pub language: Language,
}

/// A booking held back until the guest picks which name to use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConfirmation {
    /// Name on the guest's stored profile
    pub db_name: String,
    /// Name given in this conversation
    pub request_name: String,
    pub original_booking: BookingRequest,
    pub original_context: MinimalContext,
    /// Unrecognised clarification replies so far
    pub attempts: u32,
    pub max_attempts: u32,
}

impl PendingConfirmation {
    pub fn new(
        db_name: impl Into<String>,
        request_name: impl Into<String>,
        original_booking: BookingRequest,
        original_context: MinimalContext,
        max_attempts: u32,
    ) -> Self {
        Self {
            db_name: db_name.into(),
            request_name: request_name.into(),
            original_booking,
            original_context,
            attempts: 0,
            max_attempts,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    pub fn record_unmatched_reply(self) -> Self {
        Self {
            attempts: self.attempts + 1,
            ..self
        }
    }
}

/// Booking details collected so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatheringInfo {
    pub date: Option<String>,
    pub time: Option<String>,
    pub guests: Option<u32>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub special_requests: Option<String>,
}

impl GatheringInfo {
    /// Fill empty slots from `other`; known values are never overwritten with nothing
    pub fn merge(&mut self, other: GatheringInfo) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.date, other.date);
        take(&mut self.time, other.time);
        take(&mut self.guests, other.guests);
        take(&mut self.name, other.name);
        take(&mut self.phone, other.phone);
        take(&mut self.special_requests, other.special_requests);
    }

    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.date.is_none() {
            missing.push("date");
        }
        if self.time.is_none() {
            missing.push("time");
        }
        if self.guests.is_none() {
            missing.push("guests");
        }
        if self.name.is_none() {
            missing.push("name");
        }
        if self.phone.is_none() {
            missing.push("phone");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn to_booking_request(&self) -> Option<BookingRequest> {
        Some(BookingRequest {
            guest_name: self.name.clone()?,
            guest_phone: self.phone.clone()?,
            date: self.date.clone()?,
            time: self.time.clone()?,
            guests: self.guests?,
            special_requests: self.special_requests.clone(),
        })
    }
}

/// The availability check that failed before Apollo was called in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureContext {
    pub date: String,
    pub time: String,
    pub guests: u32,
    pub reason: String,
}

/// Where a conversation stands; stored by the caller and passed back each turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    Gathering {
        slots: GatheringInfo,
    },
    AwaitingNameChoice {
        pending: PendingConfirmation,
    },
    Modifying {
        reservation_id: Option<i64>,
    },
    Completed {
        reservation_id: Option<i64>,
    },
}

impl ConversationState {
    pub fn pending_confirmation(&self) -> Option<&PendingConfirmation> {
        match self {
            ConversationState::AwaitingNameChoice { pending } => Some(pending),
            _ => None,
        }
    }

    pub fn slots(&self) -> Option<&GatheringInfo> {
        match self {
            ConversationState::Gathering { slots } => Some(slots),
            _ => None,
        }
    }

    pub fn reservation_id(&self) -> Option<i64> {
        match self {
            ConversationState::Modifying { reservation_id }
            | ConversationState::Completed { reservation_id } => *reservation_id,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> PendingConfirmation {
        PendingConfirmation::new(
            "Ivan Petrov",
            "John Smith",
            BookingRequest {
                guest_name: "John Smith".into(),
                guest_phone: "+381 60 123".into(),
                date: "2030-07-14".into(),
                time: "19:00".into(),
                guests: 2,
                special_requests: None,
            },
            MinimalContext {
                restaurant_id: 1,
                timezone: "Europe/Belgrade".into(),
                session_id: Some("web-1".into()),
                language: Language::Ru,
            },
            3,
        )
    }

    #[test]
    fn test_pending_confirmation_survives_json() {
        let original = pending();
        let raw = serde_json::to_string(&ConversationState::AwaitingNameChoice {
            pending: original.clone(),
        })
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let context = value["pending"]["originalContext"].as_object().unwrap();
        let mut keys: Vec<_> = context.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["language", "restaurantId", "sessionId", "timezone"]);

        let restored: ConversationState = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored.pending_confirmation(), Some(&original));
    }

    #[test]
    fn test_gathering_merge_keeps_known_values() {
        let mut slots = GatheringInfo {
            date: Some("2030-07-14".into()),
            guests: Some(4),
            ..Default::default()
        };
        slots.merge(GatheringInfo {
            time: Some("19:00".into()),
            ..Default::default()
        });
        assert_eq!(slots.guests, Some(4));
        assert_eq!(slots.time.as_deref(), Some("19:00"));
        assert_eq!(slots.missing(), vec!["name", "phone"]);
        assert!(slots.to_booking_request().is_none());
    }
}

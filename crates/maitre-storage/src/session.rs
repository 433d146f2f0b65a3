//! Booking session snapshot shared between the caller and the context manager

use chrono::{DateTime, Utc};
use maitre_common::Language;
use serde::{Deserialize, Serialize};

/// "Already asked" markers that keep the agent from repeating questions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversationFlags {
    pub has_asked_party_size: bool,
    pub has_asked_date: bool,
    pub has_asked_time: bool,
    pub has_asked_name: bool,
    pub has_asked_phone: bool,
    pub turn_count: u32,
}

impl ConversationFlags {
    /// Merge newer flags; a question once asked stays asked
    pub fn merge(&mut self, other: &ConversationFlags) {
        self.has_asked_party_size |= other.has_asked_party_size;
        self.has_asked_date |= other.has_asked_date;
        self.has_asked_time |= other.has_asked_time;
        self.has_asked_name |= other.has_asked_name;
        self.has_asked_phone |= other.has_asked_phone;
        self.turn_count = self.turn_count.max(other.turn_count);
    }

    pub fn asked_any(&self) -> bool {
        self.has_asked_party_size
            || self.has_asked_date
            || self.has_asked_time
            || self.has_asked_name
            || self.has_asked_phone
    }
}

/// What the caller knows about an ongoing conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSession {
    pub session_id: String,
    pub restaurant_id: i64,
    #[serde(default)]
    pub language: Language,
    /// Reservation the conversation is currently about
    #[serde(default)]
    pub active_reservation_id: Option<i64>,
    /// Reservations recently shown to or touched by the guest, newest last
    #[serde(default)]
    pub recent_reservation_ids: Vec<i64>,
    #[serde(default)]
    pub last_operation: Option<String>,
    #[serde(default)]
    pub flags: ConversationFlags,
    pub updated_at: DateTime<Utc>,
}

impl BookingSession {
    pub fn new(session_id: impl Into<String>, restaurant_id: i64, language: Language) -> Self {
        Self {
            session_id: session_id.into(),
            restaurant_id,
            language,
            active_reservation_id: None,
            recent_reservation_ids: Vec::new(),
            last_operation: None,
            flags: ConversationFlags::default(),
            updated_at: Utc::now(),
        }
    }

    /// Remember a reservation as the current one
    pub fn touch_reservation(&mut self, reservation_id: i64, operation: impl Into<String>) {
        self.recent_reservation_ids.retain(|id| *id != reservation_id);
        self.recent_reservation_ids.push(reservation_id);
        self.active_reservation_id = Some(reservation_id);
        self.last_operation = Some(operation.into());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_never_unset() {
        let mut flags = ConversationFlags {
            has_asked_date: true,
            turn_count: 4,
            ..Default::default()
        };
        flags.merge(&ConversationFlags {
            has_asked_name: true,
            turn_count: 2,
            ..Default::default()
        });
        assert!(flags.has_asked_date);
        assert!(flags.has_asked_name);
        assert_eq!(flags.turn_count, 4);
    }

    #[test]
    fn test_touch_moves_reservation_to_end() {
        let mut session = BookingSession::new("s1", 1, Language::En);
        session.touch_reservation(10, "view");
        session.touch_reservation(11, "view");
        session.touch_reservation(10, "modify");
        assert_eq!(session.recent_reservation_ids, vec![11, 10]);
        assert_eq!(session.active_reservation_id, Some(10));
        assert_eq!(session.last_operation.as_deref(), Some("modify"));
    }
}

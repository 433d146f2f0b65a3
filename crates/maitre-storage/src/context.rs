//! Conversation context: which reservation is the guest talking about?

use crate::session::{BookingSession, ConversationFlags};
use async_trait::async_trait;
use maitre_common::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use tokio::sync::RwLock;
use tracing::debug;

static EXPLICIT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:#|№|\bnumber\s+|\bbooking\s+|\breservation\s+)(\d{1,9})\b")
        .expect("reservation id regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Outcome of reservation inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResolution {
    pub resolved_id: Option<i64>,
    pub confidence: Confidence,
    pub method: String,
    pub should_ask_for_clarification: bool,
}

impl ContextResolution {
    /// Used when inference is disabled or failed: trust only what the caller supplied
    pub fn fallback(provided_id: Option<i64>) -> Self {
        Self {
            resolved_id: provided_id,
            confidence: Confidence::Low,
            method: "fallback".to_string(),
            should_ask_for_clarification: true,
        }
    }

    fn found(id: i64, confidence: Confidence, method: &str) -> Self {
        Self {
            resolved_id: Some(id),
            confidence,
            method: method.to_string(),
            should_ask_for_clarification: confidence == Confidence::Low,
        }
    }
}

/// Context-resolution collaborator used by the agents
#[async_trait]
pub trait ContextManager: Send + Sync {
    async fn resolve_reservation_from_context(
        &self,
        message: &str,
        session: &BookingSession,
        provided_id: Option<i64>,
    ) -> Result<ContextResolution>;

    async fn preserve_reservation_context(
        &self,
        session: &BookingSession,
        reservation_id: i64,
        operation: &str,
    ) -> Result<()>;

    async fn update_conversation_flags(
        &self,
        session: &BookingSession,
        flags: &ConversationFlags,
    ) -> Result<()>;
}

/// Keeps session snapshots in memory, keyed by session id
#[derive(Default)]
pub struct InMemoryContextManager {
    sessions: RwLock<HashMap<String, BookingSession>>,
}

impl InMemoryContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session(&self, session_id: &str) -> Option<BookingSession> {
        self.sessions.read().await.get(session_id).cloned()
    }
}

#[async_trait]
impl ContextManager for InMemoryContextManager {
    async fn resolve_reservation_from_context(
        &self,
        message: &str,
        session: &BookingSession,
        provided_id: Option<i64>,
    ) -> Result<ContextResolution> {
        if let Some(id) = EXPLICIT_ID
            .captures(message)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok())
        {
            return Ok(ContextResolution::found(id, Confidence::High, "explicit_reference"));
        }
        if let Some(id) = provided_id {
            return Ok(ContextResolution::found(id, Confidence::High, "provided_id"));
        }

        let stored = self.session(&session.session_id).await;
        let session = stored.as_ref().unwrap_or(session);

        let resolution = match (session.active_reservation_id, session.recent_reservation_ids.as_slice()) {
            (Some(id), _) => ContextResolution::found(id, Confidence::Medium, "session_context"),
            (None, [only]) => ContextResolution::found(*only, Confidence::Medium, "single_recent"),
            _ => ContextResolution {
                resolved_id: None,
                confidence: Confidence::Low,
                method: "none".to_string(),
                should_ask_for_clarification: true,
            },
        };

        debug!(
            session_id = %session.session_id,
            method = %resolution.method,
            resolved_id = ?resolution.resolved_id,
            "Resolved reservation context"
        );
        Ok(resolution)
    }

    async fn preserve_reservation_context(
        &self,
        session: &BookingSession,
        reservation_id: i64,
        operation: &str,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session.session_id.clone())
            .or_insert_with(|| session.clone())
            .touch_reservation(reservation_id, operation);
        Ok(())
    }

    async fn update_conversation_flags(
        &self,
        session: &BookingSession,
        flags: &ConversationFlags,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session.session_id.clone())
            .or_insert_with(|| session.clone())
            .flags
            .merge(flags);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maitre_common::Language;

    fn session() -> BookingSession {
        BookingSession::new("s1", 1, Language::En)
    }

    #[tokio::test]
    async fn test_explicit_reference_wins() {
        let manager = InMemoryContextManager::new();
        let resolution = manager
            .resolve_reservation_from_context("please move booking #42 to 8pm", &session(), Some(7))
            .await
            .unwrap();
        assert_eq!(resolution.resolved_id, Some(42));
        assert_eq!(resolution.confidence, Confidence::High);
        assert!(!resolution.should_ask_for_clarification);
    }

    #[tokio::test]
    async fn test_preserved_context_is_used() {
        let manager = InMemoryContextManager::new();
        let session = session();
        manager
            .preserve_reservation_context(&session, 15, "view")
            .await
            .unwrap();

        let resolution = manager
            .resolve_reservation_from_context("change it to 4 people", &session, None)
            .await
            .unwrap();
        assert_eq!(resolution.resolved_id, Some(15));
        assert_eq!(resolution.method, "session_context");
    }

    #[tokio::test]
    async fn test_nothing_known_asks_for_clarification() {
        let manager = InMemoryContextManager::new();
        let resolution = manager
            .resolve_reservation_from_context("change my booking", &session(), None)
            .await
            .unwrap();
        assert_eq!(resolution.resolved_id, None);
        assert!(resolution.should_ask_for_clarification);
    }

    #[tokio::test]
    async fn test_flags_are_merged() {
        let manager = InMemoryContextManager::new();
        let session = session();
        manager
            .update_conversation_flags(
                &session,
                &ConversationFlags {
                    has_asked_phone: true,
                    turn_count: 3,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let stored = manager.session("s1").await.unwrap();
        assert!(stored.flags.has_asked_phone);
        assert_eq!(stored.flags.turn_count, 3);
    }
}

//! Maya: finds, modifies and cancels existing reservations
//!
//! Two failure modes shape this agent. Acting on a vague "can I change my
//! booking?" without knowing what to change, and "changing" a reservation to
//! the values it already has. Vague requests get a lookup and a question;
//! concrete ones are compared with the stored reservation before the model
//! is allowed to call `modify_reservation`.

use crate::agents::{
    Agent, AgentConfig, AgentContext, AgentResponse, AgentStats, AgentType, BaseAgent,
};
use crate::factory::AgentServices;
use crate::health::HealthReport;
use crate::locale::{self, Text};
use crate::message_analysis::{MessageAnalysis, MessageIntent, RequestedChanges, analyze_user_message};
use crate::state::ConversationState;
use async_trait::async_trait;
use maitre_common::{
    Language, MaitreError, ReservationSummary, RestaurantConfig, Result, TenantContext,
    now_in_timezone,
};
use maitre_llm::{ToolCall, ToolDefinition};
use maitre_storage::ContextResolution;
use maitre_tools::{BookingTool, tools_for};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

const MAYA_TOOLS: &[BookingTool] = &[
    BookingTool::FindExistingReservation,
    BookingTool::ModifyReservation,
    BookingTool::CancelReservation,
    BookingTool::CheckAvailability,
    BookingTool::GetRestaurantInfo,
];

/// Modification and cancellation specialist
pub struct MayaAgent {
    base: BaseAgent,
}

impl MayaAgent {
    pub fn new(config: AgentConfig, restaurant: Arc<RestaurantConfig>, services: AgentServices) -> Self {
        Self {
            base: BaseAgent::new(AgentType::Reservations, config, restaurant, services),
        }
    }

    async fn process(&self, message: &str, ctx: &AgentContext) -> Result<AgentResponse> {
        let analysis = analyze_user_message(message, ctx.language, self.base.restaurant());
        let resolution = self
            .base
            .resolve_reservation_context(message, ctx, ctx.state.reservation_id())
            .await;

        debug!(
            restaurant_id = ctx.restaurant_id,
            intent = ?analysis.intent,
            cancel = analysis.wants_cancellation,
            resolved_id = ?resolution.resolved_id,
            method = %resolution.method,
            "Maya analysed message"
        );

        if analysis.wants_cancellation {
            let current = match resolution.resolved_id {
                Some(id) => self.fetch_reservation(id, ctx).await?,
                None => None,
            };
            return self.model_turn(message, ctx, &analysis, current.as_ref()).await;
        }

        match analysis.intent {
            MessageIntent::SpecificCommand => {
                let current = match resolution.resolved_id {
                    Some(id) => self.fetch_reservation(id, ctx).await?,
                    None => None,
                };
                let current = match current {
                    Some(reservation) => reservation,
                    None => match self.single_reservation_or_listing(ctx, &resolution).await? {
                        Ok(reservation) => reservation,
                        Err(response) => return Ok(response),
                    },
                };

                if analysis.changes.is_noop(&current) {
                    return Ok(self.noop_response(&current, ctx.language));
                }
                self.base
                    .preserve_context(ctx, current.id, "modification")
                    .await;
                self.model_turn(message, ctx, &analysis, Some(&current)).await
            }
            MessageIntent::GeneralQuestion => {
                match self.single_reservation_or_listing(ctx, &resolution).await? {
                    Ok(reservation) => Ok(self.listing_response(&[reservation], ctx)),
                    Err(response) => Ok(response),
                }
            }
            MessageIntent::Unclear => {
                let current = match resolution.resolved_id {
                    Some(id) => self.fetch_reservation(id, ctx).await?,
                    None => None,
                };
                self.model_turn(message, ctx, &analysis, current.as_ref()).await
            }
        }
    }

    /// Look up the reservation with exactly this id
    async fn fetch_reservation(
        &self,
        reservation_id: i64,
        ctx: &AgentContext,
    ) -> Result<Option<ReservationSummary>> {
        let found = self
            .find_reservations(&reservation_id.to_string(), "all", ctx)
            .await?;
        Ok(found.into_iter().find(|r| r.id == reservation_id))
    }

    async fn find_reservations(
        &self,
        identifier: &str,
        time_range: &str,
        ctx: &AgentContext,
    ) -> Result<Vec<ReservationSummary>> {
        let call = ToolCall::new(
            BookingTool::FindExistingReservation.name(),
            json!({ "identifier": identifier, "timeRange": time_range }),
        );
        let envelope = self.base.execute_tool(&call, ctx).await;

        if !envelope.is_success() {
            let not_found = envelope
                .error
                .as_ref()
                .and_then(|e| e.code.as_deref())
                .is_some_and(|code| code == "NO_RESERVATIONS_FOUND");
            if not_found {
                return Ok(Vec::new());
            }
        }

        let data = envelope.into_result()?;
        let reservations = data.get("reservations").cloned().unwrap_or(Value::Null);
        if reservations.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(reservations).map_err(MaitreError::from)
    }

    /// Ok with the guest's only upcoming reservation, or Err with the reply to send instead
    async fn single_reservation_or_listing(
        &self,
        ctx: &AgentContext,
        resolution: &ContextResolution,
    ) -> Result<std::result::Result<ReservationSummary, AgentResponse>> {
        if let Some(id) = resolution.resolved_id {
            if let Some(reservation) = self.fetch_reservation(id, ctx).await? {
                return Ok(Ok(reservation));
            }
        }

        let Some(identity) = ctx.guest_identifier() else {
            let content = locale::text(ctx.language, Text::AskIdentity);
            return Ok(Err(AgentResponse::new(AgentType::Reservations, content)
                .with_decision("identity_required")
                .with_next_state(ConversationState::Modifying {
                    reservation_id: None,
                })));
        };

        let mut found = self.find_reservations(&identity, "upcoming", ctx).await?;
        match found.len() {
            0 => {
                let content = locale::text(ctx.language, Text::NoReservationsFound);
                Ok(Err(AgentResponse::new(AgentType::Reservations, content)
                    .with_decision("no_reservations_found")))
            }
            1 => Ok(Ok(found.remove(0))),
            _ => Ok(Err(self.listing_response(&found, ctx))),
        }
    }

    /// Every found reservation with its number, then a question
    fn listing_response(&self, reservations: &[ReservationSummary], ctx: &AgentContext) -> AgentResponse {
        let language = ctx.language;
        let guests = locale::text(language, Text::Guests);
        let lines: Vec<String> = reservations
            .iter()
            .map(|r| format_reservation_line(r, guests))
            .collect();

        let question = if reservations.len() == 1 {
            Text::WhatToChange
        } else {
            Text::WhichReservation
        };
        let content = format!(
            "{}\n{}\n\n{}",
            locale::text(language, Text::ReservationsHeader),
            lines.join("\n"),
            locale::text(language, question)
        );

        let reservation_id = match reservations {
            [only] => Some(only.id),
            _ => None,
        };
        let mut response = AgentResponse::new(AgentType::Reservations, content)
            .with_decision("reservations_listed")
            .with_next_state(ConversationState::Modifying { reservation_id });
        if let Some(id) = reservation_id {
            response = response.with_reservation(id);
        }
        response
    }

    fn noop_response(&self, current: &ReservationSummary, language: Language) -> AgentResponse {
        info!(
            event = "noop_modification_blocked",
            reservation_id = current.id,
            "Requested change matches the current reservation"
        );
        let content = locale::render(
            language,
            Text::NoopModification,
            &[
                ("id", &current.id.to_string()),
                ("date", &current.date),
                ("time", &current.time),
                ("guests", &current.guests.to_string()),
            ],
        );
        AgentResponse::new(AgentType::Reservations, content)
            .with_decision("noop_modification_blocked")
            .with_reservation(current.id)
            .with_next_state(ConversationState::Modifying {
                reservation_id: Some(current.id),
            })
            .requiring_confirmation()
    }

    async fn model_turn(
        &self,
        message: &str,
        ctx: &AgentContext,
        analysis: &MessageAnalysis,
        current: Option<&ReservationSummary>,
    ) -> Result<AgentResponse> {
        let mut prompt = self.generate_system_prompt(ctx);
        if let Some(reservation) = current {
            prompt.push_str(&format!(
                "\n\nCURRENT RESERVATION: #{} for {} on {} at {}, {} guests, status {:?}.",
                reservation.id,
                reservation.guest_name,
                reservation.date,
                reservation.time,
                reservation.guests,
                reservation.status
            ));
        }
        if !analysis.changes.is_empty() {
            prompt.push_str(&format!(
                "\nREQUESTED CHANGES: {}.",
                describe_changes(&analysis.changes)
            ));
        }
        if analysis.wants_cancellation {
            prompt.push_str(
                "\nThe guest wants to cancel. Confirm which reservation and call cancel_reservation \
                 with confirmCancellation=true only after the guest has explicitly confirmed.",
            );
        }

        let turn = self.base.converse(prompt, message, ctx, self.tools()).await?;

        // The model can still propose a change to the values already booked
        if let Some(reservation) = current {
            let noop_call = turn
                .tool_calls
                .iter()
                .filter(|c| c.name == BookingTool::ModifyReservation.name())
                .any(|c| changes_from_arguments(&c.arguments).is_noop(reservation));
            if noop_call {
                return Ok(self.noop_response(reservation, ctx.language));
            }
        }

        let cancel_confirmed = turn.tool_calls.iter().any(|c| {
            c.name == BookingTool::CancelReservation.name()
                && c.arguments
                    .get("confirmCancellation")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
        });

        let touched = turn
            .tool_calls
            .iter()
            .filter_map(|c| c.arguments.get("reservationId").and_then(Value::as_i64))
            .next()
            .or(current.map(|r| r.id));
        if let Some(id) = touched {
            let operation = if analysis.wants_cancellation {
                "cancellation"
            } else {
                "modification"
            };
            self.base.preserve_context(ctx, id, operation).await;
        }

        let mut response = AgentResponse::new(AgentType::Reservations, turn.text.unwrap_or_default())
            .with_tool_calls(turn.tool_calls)
            .with_next_state(ConversationState::Modifying {
                reservation_id: touched,
            });
        if let Some(id) = touched {
            response = response.with_reservation(id);
        }
        if analysis.wants_cancellation && !cancel_confirmed {
            response = response.requiring_confirmation();
        }
        Ok(response)
    }
}

#[async_trait]
impl Agent for MayaAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Reservations
    }

    fn name(&self) -> &str {
        &self.base.config().name
    }

    fn config(&self) -> &AgentConfig {
        self.base.config()
    }

    fn generate_system_prompt(&self, ctx: &AgentContext) -> String {
        let restaurant = self.base.restaurant();
        let now = now_in_timezone(&ctx.timezone);

        let mut prompt = format!(
            "You are {}, who manages existing reservations at {}.\n\n\
             LANGUAGE: Reply only in {}. Never switch languages during the conversation.\n\n\
             TODAY: {} (current year {}). Restaurant hours {} to {} ({}).\n\n\
             RULES:\n\
             - Never guess what the guest wants to change. If it is unclear, ask whether it is the date, the time or the number of guests.\n\
             - Before modifying, look up the reservation and compare. If the requested values equal the current ones, say so and ask what should change instead.\n\
             - When several reservations match, list every one of them with its number and let the guest choose.\n\
             - Check availability before moving a reservation to a new date or time.\n\
             - Never cancel without explicit confirmation from the guest.",
            self.name(),
            restaurant.name,
            ctx.language.display_name(),
            now.format("%Y-%m-%d"),
            now.format("%Y"),
            restaurant.opening_time,
            restaurant.closing_time,
            restaurant.timezone,
        );

        if let Some(id) = ctx.state.reservation_id() {
            prompt.push_str(&format!(
                "\n\nThe conversation is about reservation #{}.",
                id
            ));
        }
        if let Some(identity) = ctx.guest_identifier() {
            prompt.push_str(&format!(
                "\nUse \"{}\" as the identifier when looking up the guest's reservations.",
                identity
            ));
        }
        prompt
    }

    async fn handle_message(&self, message: &str, ctx: &AgentContext) -> AgentResponse {
        match self.process(message, ctx).await {
            Ok(response) => response,
            Err(e) => self
                .base
                .handle_agent_error(&e, "maya.handle_message", ctx.language),
        }
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        tools_for(MAYA_TOOLS)
    }

    async fn health_check(&self, tenant: &TenantContext) -> HealthReport {
        self.base.health_check(tenant, &self.tools()).await
    }

    fn stats(&self) -> AgentStats {
        self.base.stats()
    }
}

fn format_reservation_line(reservation: &ReservationSummary, guests_word: &str) -> String {
    format!(
        "#{} — {} {}, {} {} ({})",
        reservation.id,
        reservation.date,
        reservation.time,
        reservation.guests,
        guests_word,
        reservation.guest_name
    )
}

fn describe_changes(changes: &RequestedChanges) -> String {
    let mut parts = Vec::new();
    if let Some(date) = &changes.date {
        parts.push(format!("date {}", date));
    }
    if let Some(time) = &changes.time {
        parts.push(format!("time {}", time));
    }
    if let Some(guests) = changes.guests {
        parts.push(format!("{} guests", guests));
    }
    parts.join(", ")
}

fn changes_from_arguments(args: &Value) -> RequestedChanges {
    let mods = args.get("modifications").unwrap_or(&Value::Null);
    let text = |key: &str| mods.get(key).and_then(Value::as_str).map(str::to_string);
    RequestedChanges {
        time: text("newTime"),
        date: text("newDate"),
        guests: mods
            .get("newGuests")
            .and_then(Value::as_u64)
            .and_then(|g| u32::try_from(g).ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockAiService, MockReply, MockToolExecutor, agent_parts, context};
    use chrono::Utc;
    use maitre_common::{GuestHistory, ReservationStatus};
    use maitre_llm::LlmTurn;

    fn maya(llm: Arc<MockAiService>, executor: Arc<MockToolExecutor>) -> MayaAgent {
        let (config, restaurant, services) = agent_parts(AgentType::Reservations, llm, executor);
        MayaAgent::new(config, restaurant, services)
    }

    fn reservation(id: i64, time: &str) -> ReservationSummary {
        ReservationSummary {
            id,
            guest_name: "Ivan Petrov".into(),
            guest_phone: Some("+7 900 123".into()),
            date: "2030-07-14".into(),
            time: time.into(),
            guests: 2,
            status: ReservationStatus::Confirmed,
            special_requests: None,
            table_name: Some("T1".into()),
        }
    }

    fn known_guest() -> GuestHistory {
        GuestHistory {
            guest_name: "Ivan Petrov".into(),
            guest_phone: "+7 900 123".into(),
            total_bookings: 2,
            total_cancellations: 0,
            last_visit_date: None,
            common_party_size: None,
            frequent_special_requests: vec![],
            retrieved_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_change_to_current_time_is_blocked() {
        let llm = MockAiService::new(vec![]);
        let executor = MockToolExecutor::new();
        executor.book.insert(reservation(41, "19:00")).await;
        let agent = maya(llm.clone(), executor.clone());
        let ctx = context().with_state(ConversationState::Modifying {
            reservation_id: Some(41),
        });

        let response = agent.handle_message("change to 19:00", &ctx).await;
        assert!(response.tool_calls.is_empty());
        assert!(response.requires_confirmation);
        assert!(response.content.contains("already set"));
        assert_eq!(
            response.metadata.decision.as_deref(),
            Some("noop_modification_blocked")
        );
        assert!(llm.prompts().await.is_empty());
        assert_eq!(executor.called().await, vec!["find_existing_reservation"]);
    }

    #[tokio::test]
    async fn test_model_noop_modify_call_is_dropped() {
        let modify = ToolCall::new(
            "modify_reservation",
            json!({"reservationId": 41, "modifications": {"newTime": "19:00", "newGuests": 2}}),
        );
        let llm = MockAiService::new(vec![MockReply::Turn(LlmTurn::tool_calls(vec![modify]))]);
        let executor = MockToolExecutor::new();
        executor.book.insert(reservation(41, "19:00")).await;
        let agent = maya(llm, executor);
        let ctx = context().with_state(ConversationState::Modifying {
            reservation_id: Some(41),
        });

        // The guest asks for new values but the model proposes the stored ones
        let response = agent.handle_message("keep it for 3 people at 20:00", &ctx).await;
        assert!(response.tool_calls.is_empty());
        assert_eq!(
            response.metadata.decision.as_deref(),
            Some("noop_modification_blocked")
        );
    }

    #[tokio::test]
    async fn test_real_change_reaches_model() {
        let modify = ToolCall::new(
            "modify_reservation",
            json!({"reservationId": 41, "modifications": {"newTime": "20:30"}}),
        );
        let llm = MockAiService::new(vec![MockReply::Turn(LlmTurn {
            text: Some("Moving it to 20:30.".into()),
            tool_calls: vec![modify],
        })]);
        let executor = MockToolExecutor::new();
        executor.book.insert(reservation(41, "19:00")).await;
        let agent = maya(llm.clone(), executor);
        let ctx = context().with_state(ConversationState::Modifying {
            reservation_id: Some(41),
        });

        let response = agent.handle_message("please move it to 20:30", &ctx).await;
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.reservation_id, Some(41));
        let prompt = &llm.prompts().await[0];
        assert!(prompt.contains("CURRENT RESERVATION: #41"));
        assert!(prompt.contains("REQUESTED CHANGES: time 20:30"));
    }

    #[tokio::test]
    async fn test_vague_request_lists_every_reservation() {
        let llm = MockAiService::new(vec![]);
        let executor = MockToolExecutor::new();
        executor.book.insert(reservation(41, "19:00")).await;
        executor.book.insert(reservation(42, "13:00")).await;
        executor.book.insert(reservation(43, "21:00")).await;
        let agent = maya(llm.clone(), executor);
        let ctx = context().with_guest_history(known_guest());

        let response = agent
            .handle_message("I want to change my reservation", &ctx)
            .await;
        assert!(response.content.contains("#41 — 2030-07-14 19:00, 2 guests (Ivan Petrov)"));
        assert!(response.content.contains("#42"));
        assert!(response.content.contains("#43"));
        assert!(response.content.contains("Which reservation"));
        assert!(response.tool_calls.is_empty());
        assert!(llm.prompts().await.is_empty());
    }

    #[tokio::test]
    async fn test_single_reservation_asks_what_to_change() {
        let executor = MockToolExecutor::new();
        executor.book.insert(reservation(41, "19:00")).await;
        let agent = maya(MockAiService::new(vec![]), executor);
        let ctx = context().with_guest_history(known_guest());

        let response = agent
            .handle_message("I want to change my reservation", &ctx)
            .await;
        assert!(response.content.contains("What would you like to change"));
        assert_eq!(response.reservation_id, Some(41));
    }

    #[tokio::test]
    async fn test_unknown_guest_is_asked_for_identity() {
        let agent = maya(MockAiService::new(vec![]), MockToolExecutor::new());
        let response = agent
            .handle_message("I want to change my reservation", &context())
            .await;
        assert!(response.content.contains("name or phone number"));
    }

    #[tokio::test]
    async fn test_cancellation_requires_confirmation() {
        let llm = MockAiService::new(vec![MockReply::Text(
            "Shall I cancel reservation #41?".into(),
        )]);
        let executor = MockToolExecutor::new();
        executor.book.insert(reservation(41, "19:00")).await;
        let agent = maya(llm, executor);

        let response = agent
            .handle_message("please cancel booking #41", &context())
            .await;
        assert!(response.requires_confirmation);
        assert_eq!(response.reservation_id, Some(41));
    }
}

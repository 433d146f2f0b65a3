//! Sofia: takes a guest from greeting to a confirmed new reservation

use crate::agents::{
    Agent, AgentConfig, AgentContext, AgentResponse, AgentStats, AgentType, BaseAgent,
};
use crate::factory::AgentServices;
use crate::health::HealthReport;
use crate::locale::{self, Text};
use crate::message_analysis::{extract_date, extract_guests, extract_time_for};
use crate::name_resolution::{NameResolution, resolve_pending_confirmation};
use crate::state::{ConversationState, GatheringInfo, PendingConfirmation};
use async_trait::async_trait;
use maitre_common::{
    BookingRequest, Language, RestaurantConfig, Result, TenantContext, format_time,
    now_in_timezone,
};
use maitre_llm::{ToolCall, ToolDefinition};
use maitre_storage::ConversationFlags;
use maitre_tools::{BookingTool, tools_for};
use regex::Regex;
use serde_json::{Value, json};
use std::fmt::Write;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

const SOFIA_TOOLS: &[BookingTool] = &[
    BookingTool::CheckAvailability,
    BookingTool::FindAlternativeTimes,
    BookingTool::CreateReservation,
    BookingTool::GetRestaurantInfo,
    BookingTool::GetGuestHistory,
];

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\d[\d\s\-()]{5,}\d").expect("phone regex is valid")
});

static INTRODUCED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:my name is|under the name|name is|меня зовут|на имя|zovem se|na ime|a nevem|ich heiße|ich heisse|je m'appelle|me llamo|mi chiamo|meu nome é|mijn naam is)\s+(\p{L}[\p{L}'\-]*(?:\s+\p{Lu}[\p{L}'\-]*)?)",
    )
    .expect("name regex is valid")
});

/// New-booking specialist
pub struct SofiaAgent {
    base: BaseAgent,
}

impl SofiaAgent {
    pub fn new(config: AgentConfig, restaurant: Arc<RestaurantConfig>, services: AgentServices) -> Self {
        Self {
            base: BaseAgent::new(AgentType::Booking, config, restaurant, services),
        }
    }

    async fn process(&self, message: &str, ctx: &AgentContext) -> Result<AgentResponse> {
        if let Some(pending) = ctx.state.pending_confirmation() {
            return Ok(self.continue_name_choice(pending.clone(), message));
        }

        let mut turn_ctx = ctx.clone();
        turn_ctx.gathering.merge(extract_slots(message, ctx.language, self.base.restaurant()));

        let prompt = self.generate_system_prompt(&turn_ctx);
        let turn = self
            .base
            .converse(prompt, message, &turn_ctx, self.tools())
            .await?;

        for call in &turn.tool_calls {
            turn_ctx.gathering.merge(slots_from_arguments(&call.arguments));
        }

        if let Some(pending) = self.detect_name_mismatch(&turn.tool_calls, &turn_ctx) {
            return Ok(self.ask_name_choice(pending));
        }

        let content = turn.text.unwrap_or_default();
        let mut flags = turn_ctx.flags.clone();
        flags.turn_count += 1;
        mark_asked(&mut flags, &turn_ctx.gathering, &content);
        self.base.update_conversation_flags(&turn_ctx, &flags).await;

        let books = turn
            .tool_calls
            .iter()
            .any(|c| c.name == BookingTool::CreateReservation.name());
        let next_state = if books {
            ConversationState::Completed {
                reservation_id: None,
            }
        } else {
            ConversationState::Gathering {
                slots: turn_ctx.gathering.clone(),
            }
        };

        debug!(
            restaurant_id = ctx.restaurant_id,
            tool_calls = turn.tool_calls.len(),
            missing = ?turn_ctx.gathering.missing(),
            "Sofia turn completed"
        );

        Ok(AgentResponse::new(AgentType::Booking, content)
            .with_tool_calls(turn.tool_calls)
            .with_next_state(next_state))
    }

    /// A returning guest is booking under a different name than their profile
    fn detect_name_mismatch(
        &self,
        calls: &[ToolCall],
        ctx: &AgentContext,
    ) -> Option<PendingConfirmation> {
        let history = ctx.guest_history.as_ref()?;
        let call = calls
            .iter()
            .find(|c| c.name == BookingTool::CreateReservation.name())?;
        let booking = booking_from_arguments(&call.arguments)?;

        if same_name(&history.guest_name, &booking.guest_name) {
            return None;
        }

        Some(PendingConfirmation::new(
            history.guest_name.clone(),
            booking.guest_name.clone(),
            booking,
            ctx.minimal(),
            self.base.config().max_clarification_attempts,
        ))
    }

    fn ask_name_choice(&self, pending: PendingConfirmation) -> AgentResponse {
        let language = pending.original_context.language;
        info!(
            event = "name_clarification_requested",
            restaurant_id = pending.original_context.restaurant_id,
            "Guest name differs from stored profile"
        );

        let content = locale::render(
            language,
            Text::NameClarifyFirst,
            &[("db_name", &pending.db_name), ("request_name", &pending.request_name)],
        );
        AgentResponse::new(AgentType::Booking, content)
            .with_decision("name_clarification_requested")
            .with_next_state(ConversationState::AwaitingNameChoice { pending })
            .requiring_confirmation()
    }

    fn continue_name_choice(&self, pending: PendingConfirmation, reply: &str) -> AgentResponse {
        let language = pending.original_context.language;
        let restaurant_id = pending.original_context.restaurant_id;

        match resolve_pending_confirmation(pending, reply) {
            NameResolution::Resolved {
                name,
                stage,
                booking,
            } => {
                info!(
                    event = "name_resolved_by_extraction",
                    restaurant_id,
                    stage = stage.as_str(),
                    "Guest chose a name"
                );
                let content = locale::render(language, Text::NameConfirmed, &[("name", &name)]);
                self.book(content, &booking)
                    .with_decision("name_resolved_by_extraction")
                    .with_confidence(1.0)
            }
            NameResolution::Fallback { name, booking } => {
                info!(
                    event = "name_resolved_by_fallback",
                    restaurant_id,
                    "Clarification attempts exhausted, using requested name"
                );
                let content = locale::render(language, Text::NameFallback, &[("name", &name)]);
                self.book(content, &booking)
                    .with_decision("name_resolved_by_fallback")
                    .with_confidence(0.5)
            }
            NameResolution::Clarify { pending } => {
                let key = if pending.attempts <= 1 {
                    Text::NameClarifySecond
                } else {
                    Text::NameClarifyFinal
                };
                debug!(restaurant_id, attempts = pending.attempts, "Name choice still unclear");
                let content = locale::render(
                    language,
                    key,
                    &[("db_name", &pending.db_name), ("request_name", &pending.request_name)],
                );
                AgentResponse::new(AgentType::Booking, content)
                    .with_decision("name_clarification_repeated")
                    .with_next_state(ConversationState::AwaitingNameChoice { pending })
                    .requiring_confirmation()
            }
        }
    }

    fn book(&self, content: String, booking: &BookingRequest) -> AgentResponse {
        let call = ToolCall::new(
            BookingTool::CreateReservation.name(),
            booking_arguments(booking),
        );
        AgentResponse::new(AgentType::Booking, content)
            .with_tool_calls(vec![call])
            .with_next_state(ConversationState::Completed {
                reservation_id: None,
            })
    }

    fn hours_section(&self, restaurant: &RestaurantConfig) -> String {
        let mut section = format!(
            "RESTAURANT HOURS: {} to {} ({}).",
            restaurant.opening_time, restaurant.closing_time, restaurant.timezone
        );
        if restaurant.is_overnight() {
            let _ = write!(
                section,
                " The restaurant operates past midnight: closing at {} means {} on the following day. \
                 Times after midnight up to closing are valid.",
                restaurant.closing_time, restaurant.closing_time
            );
        }
        if let Some(last) = restaurant.last_bookable_time() {
            let _ = write!(
                section,
                " The last bookable time is {} (closing time minus the {} minute table time). \
                 Never accept a reservation starting after {}.",
                format_time(last),
                restaurant.avg_reservation_duration,
                format_time(last)
            );
        }
        section
    }

    fn personalization_section(&self, ctx: &AgentContext) -> Option<String> {
        if !self.base.config().enable_personalization {
            return None;
        }
        let history = ctx.guest_history.as_ref()?;

        let mut lines = vec![format!("GUEST PROFILE: stored name {}.", history.guest_name)];
        if history.is_regular() {
            lines.push(format!(
                "This is a regular guest with {} previous bookings. Greet them warmly as a returning guest.",
                history.total_bookings
            ));
        } else if history.total_bookings > 0 {
            lines.push(format!(
                "The guest has booked with us {} time(s) before.",
                history.total_bookings
            ));
        }
        if let Some(size) = history.common_party_size {
            lines.push(format!(
                "They usually come as a party of {}. You may suggest it, but the guest must confirm the number explicitly.",
                size
            ));
        }
        if !history.frequent_special_requests.is_empty() {
            lines.push(format!(
                "Frequent special requests: {}. Offer to add them to the booking.",
                history.frequent_special_requests.join(", ")
            ));
        }
        Some(lines.join("\n"))
    }
}

#[async_trait]
impl Agent for SofiaAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Booking
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
        let mut sections = Vec::new();

        sections.push(format!(
            "You are {}, the reservation host of {}{}. You help guests make new table reservations.",
            self.name(),
            restaurant.name,
            restaurant
                .cuisine
                .as_deref()
                .map(|c| format!(", a {} restaurant", c))
                .unwrap_or_default()
        ));

        sections.push(format!(
            "LANGUAGE: Reply only in {}. Never switch languages during the conversation, \
             even if the guest mixes languages or tool results are in English.",
            ctx.language.display_name()
        ));

        sections.push(self.hours_section(restaurant));

        sections.push(format!(
            "TODAY: {} (date {}), current local time {}. The current year is {}. \
             Resolve \"today\", \"tomorrow\" and weekday names against this date, never against an earlier year.",
            now.format("%A"),
            now.format("%Y-%m-%d"),
            now.format("%H:%M"),
            now.format("%Y")
        ));

        if let Some(personal) = self.personalization_section(ctx) {
            sections.push(personal);
        }

        let known = known_slots(&ctx.gathering);
        if !known.is_empty() {
            sections.push(format!(
                "ALREADY PROVIDED (do not ask again): {}.",
                known.join(", ")
            ));
        }
        let asked = asked_questions(&ctx.flags);
        if !asked.is_empty() {
            sections.push(format!(
                "YOU ALREADY ASKED FOR: {}. Do not repeat these questions; use what the guest said.",
                asked.join(", ")
            ));
        }

        sections.push(
            "RULES:\n\
             - Ask for one missing detail at a time.\n\
             - Never call check_availability until the guest has explicitly stated the date, the time and the number of guests. Never assume a party size.\n\
             - Never call create_reservation before availability is confirmed and you have the guest's name and phone number.\n\
             - If a slot is unavailable, call find_alternative_times and offer the results.\n\
             - Never invent availability, prices or policies."
                .to_string(),
        );

        if let Some(booking) = ctx.gathering.to_booking_request() {
            sections.push(format!(
                "FINAL BOOKING DIRECTIVE. These details are confirmed and must be used exactly as written. \
                 Do not re-derive, reformat or change any of them:\n\
                 name: {}\nphone: {}\ndate: {}\ntime: {}\nguests: {}{}",
                booking.guest_name,
                booking.guest_phone,
                booking.date,
                booking.time,
                booking.guests,
                booking
                    .special_requests
                    .as_deref()
                    .map(|r| format!("\nspecial requests: {}", r))
                    .unwrap_or_default()
            ));
        }

        sections.join("\n\n")
    }

    async fn handle_message(&self, message: &str, ctx: &AgentContext) -> AgentResponse {
        match self.process(message, ctx).await {
            Ok(response) => response,
            Err(e) => self
                .base
                .handle_agent_error(&e, "sofia.handle_message", ctx.language),
        }
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        tools_for(SOFIA_TOOLS)
    }

    async fn health_check(&self, tenant: &TenantContext) -> HealthReport {
        self.base.health_check(tenant, &self.tools()).await
    }

    fn stats(&self) -> AgentStats {
        self.base.stats()
    }
}

/// Slots stated directly in the guest's message
fn extract_slots(message: &str, language: Language, restaurant: &RestaurantConfig) -> GatheringInfo {
    GatheringInfo {
        date: extract_date(message, language, &restaurant.timezone),
        time: extract_time_for(message, restaurant),
        guests: extract_guests(message),
        name: INTRODUCED_NAME
            .captures(message)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string()),
        phone: PHONE
            .find(message)
            .map(|m| m.as_str().trim().to_string())
            .filter(|p| p.chars().filter(char::is_ascii_digit).count() >= 7),
        special_requests: None,
    }
}

/// Slots the model committed to in a tool call
fn slots_from_arguments(args: &Value) -> GatheringInfo {
    let text = |key: &str| {
        args.get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
    };
    GatheringInfo {
        date: text("date"),
        time: text("time").or_else(|| text("preferredTime")),
        guests: args
            .get("guests")
            .and_then(Value::as_u64)
            .and_then(|g| u32::try_from(g).ok()),
        name: text("guestName"),
        phone: text("guestPhone"),
        special_requests: text("specialRequests"),
    }
}

fn booking_from_arguments(args: &Value) -> Option<BookingRequest> {
    slots_from_arguments(args).to_booking_request()
}

fn booking_arguments(booking: &BookingRequest) -> Value {
    let mut args = json!({
        "guestName": booking.guest_name,
        "guestPhone": booking.guest_phone,
        "date": booking.date,
        "time": booking.time,
        "guests": booking.guests,
    });
    if let Some(requests) = &booking.special_requests {
        args["specialRequests"] = json!(requests);
    }
    args
}

fn same_name(a: &str, b: &str) -> bool {
    let norm = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    norm(a) == norm(b)
}

fn known_slots(slots: &GatheringInfo) -> Vec<String> {
    let mut known = Vec::new();
    if let Some(date) = &slots.date {
        known.push(format!("date {}", date));
    }
    if let Some(time) = &slots.time {
        known.push(format!("time {}", time));
    }
    if let Some(guests) = slots.guests {
        known.push(format!("{} guests", guests));
    }
    if let Some(name) = &slots.name {
        known.push(format!("name {}", name));
    }
    if let Some(phone) = &slots.phone {
        known.push(format!("phone {}", phone));
    }
    known
}

fn asked_questions(flags: &ConversationFlags) -> Vec<&'static str> {
    [
        (flags.has_asked_date, "date"),
        (flags.has_asked_time, "time"),
        (flags.has_asked_party_size, "party size"),
        (flags.has_asked_name, "name"),
        (flags.has_asked_phone, "phone"),
    ]
    .into_iter()
    .filter(|(asked, _)| *asked)
    .map(|(_, label)| label)
    .collect()
}

/// A reply ending in a question asks for the first missing slot
fn mark_asked(flags: &mut ConversationFlags, slots: &GatheringInfo, reply: &str) {
    if !reply.trim_end().ends_with('?') {
        return;
    }
    match slots.missing().first().copied() {
        Some("date") => flags.has_asked_date = true,
        Some("time") => flags.has_asked_time = true,
        Some("guests") => flags.has_asked_party_size = true,
        Some("name") => flags.has_asked_name = true,
        Some("phone") => flags.has_asked_phone = true,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MinimalContext;
    use crate::testing::{MockAiService, MockReply, MockToolExecutor, agent_parts, context};
    use chrono::Utc;
    use maitre_common::GuestHistory;
    use maitre_llm::LlmTurn;

    fn sofia(llm: Arc<MockAiService>) -> SofiaAgent {
        let (config, restaurant, services) =
            agent_parts(AgentType::Booking, llm, MockToolExecutor::new());
        SofiaAgent::new(config, restaurant, services)
    }

    fn history(name: &str, bookings: u32) -> GuestHistory {
        GuestHistory {
            guest_name: name.into(),
            guest_phone: "+381 60 123 4567".into(),
            total_bookings: bookings,
            total_cancellations: 0,
            last_visit_date: Some("2030-05-01".into()),
            common_party_size: Some(4),
            frequent_special_requests: vec!["window seat".into()],
            retrieved_at: Utc::now(),
        }
    }

    fn pending() -> PendingConfirmation {
        PendingConfirmation::new(
            "Ivan Petrov",
            "John Smith",
            BookingRequest {
                guest_name: "John Smith".into(),
                guest_phone: "+381 60 123 4567".into(),
                date: "2030-07-14".into(),
                time: "19:00".into(),
                guests: 2,
                special_requests: None,
            },
            MinimalContext {
                restaurant_id: 1,
                timezone: "Europe/Belgrade".into(),
                session_id: None,
                language: Language::En,
            },
            3,
        )
    }

    #[tokio::test]
    async fn test_name_clarification_always_makes_progress() {
        let llm = MockAiService::new(vec![]);
        let agent = sofia(llm.clone());
        let mut state = ConversationState::AwaitingNameChoice { pending: pending() };

        // The first question was already asked; two re-asks bring the total to three
        for _ in 0..2 {
            let ctx = context().with_state(state.clone());
            let response = agent.handle_message("hmm?", &ctx).await;
            assert!(response.tool_calls.is_empty());
            assert!(response.requires_confirmation);
            assert!(response.content.contains("Ivan Petrov"));
            state = response.next_state.expect("still awaiting a name");
            assert!(state.pending_confirmation().is_some());
        }

        let ctx = context().with_state(state);
        let response = agent.handle_message("hmm?", &ctx).await;
        assert!(!response.requires_confirmation);
        assert!(response.has_booking);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "create_reservation");
        assert_eq!(response.tool_calls[0].arguments["guestName"], "John Smith");
        assert_eq!(
            response.metadata.decision.as_deref(),
            Some("name_resolved_by_fallback")
        );
        assert!(llm.prompts().await.is_empty());
    }

    #[tokio::test]
    async fn test_clarification_prompts_get_more_direct() {
        let agent = sofia(MockAiService::new(vec![]));
        let ctx = context().with_state(ConversationState::AwaitingNameChoice { pending: pending() });

        let first = agent.handle_message("hmm", &ctx).await;
        assert!(first.content.starts_with("Just to be sure"));

        let ctx = context().with_state(first.next_state.unwrap());
        let second = agent.handle_message("hmm", &ctx).await;
        assert!(second.content.starts_with("Please type exactly one name"));
    }

    #[tokio::test]
    async fn test_yes_to_first_question_books_new_name() {
        let agent = sofia(MockAiService::new(vec![]));
        let asked = agent.ask_name_choice(pending());
        assert!(asked.content.contains("under John Smith instead?"));

        let ctx = context().with_state(asked.next_state.unwrap());
        let response = agent.handle_message("yes", &ctx).await;
        assert_eq!(response.tool_calls[0].arguments["guestName"], "John Smith");

        // After a re-ask naming both options "yes" chooses nothing
        let ctx = context().with_state(ConversationState::AwaitingNameChoice {
            pending: pending().record_unmatched_reply(),
        });
        let response = agent.handle_message("yes", &ctx).await;
        assert!(response.tool_calls.is_empty());
        assert!(response.content.starts_with("Please type exactly one name"));
    }

    #[tokio::test]
    async fn test_clear_choice_books_with_chosen_name() {
        let agent = sofia(MockAiService::new(vec![]));
        let ctx = context().with_state(ConversationState::AwaitingNameChoice { pending: pending() });

        let response = agent.handle_message("Ivan Petrov please", &ctx).await;
        assert_eq!(response.tool_calls[0].arguments["guestName"], "Ivan Petrov");
        assert_eq!(response.tool_calls[0].arguments["time"], "19:00");
        assert_eq!(
            response.metadata.decision.as_deref(),
            Some("name_resolved_by_extraction")
        );
    }

    #[tokio::test]
    async fn test_create_with_different_name_is_held_back() {
        let create = ToolCall::new(
            "create_reservation",
            json!({
                "guestName": "John Smith",
                "guestPhone": "+381 60 123 4567",
                "date": "2030-07-14",
                "time": "19:00",
                "guests": 2
            }),
        );
        let llm = MockAiService::new(vec![MockReply::Turn(LlmTurn::tool_calls(vec![create]))]);
        let agent = sofia(llm);
        let ctx = context().with_guest_history(history("Ivan Petrov", 5));

        let response = agent
            .handle_message("Book it under John Smith please", &ctx)
            .await;
        assert!(response.tool_calls.is_empty());
        assert!(!response.has_booking);
        assert!(response.requires_confirmation);
        let pending = response
            .next_state
            .as_ref()
            .and_then(ConversationState::pending_confirmation)
            .expect("pending confirmation");
        assert_eq!(pending.db_name, "Ivan Petrov");
        assert_eq!(pending.request_name, "John Smith");
        assert_eq!(pending.attempts, 0);
    }

    #[tokio::test]
    async fn test_matching_name_books_directly() {
        let create = ToolCall::new(
            "create_reservation",
            json!({
                "guestName": "ivan petrov",
                "guestPhone": "+381 60 123 4567",
                "date": "2030-07-14",
                "time": "19:00",
                "guests": 2
            }),
        );
        let llm = MockAiService::new(vec![MockReply::Turn(LlmTurn {
            text: Some("Booking now.".into()),
            tool_calls: vec![create],
        })]);
        let agent = sofia(llm);
        let ctx = context().with_guest_history(history("Ivan Petrov", 5));

        let response = agent.handle_message("Yes, book it", &ctx).await;
        assert!(response.has_booking);
        assert!(matches!(
            response.next_state,
            Some(ConversationState::Completed { .. })
        ));
    }

    #[tokio::test]
    async fn test_prompt_includes_hours_year_and_history() {
        let llm = MockAiService::new(vec![MockReply::Text("How many guests?".into())]);
        let agent = sofia(llm.clone());
        let ctx = context().with_guest_history(history("Ivan Petrov", 5));

        let response = agent
            .handle_message("I'd like a table tomorrow at 19:00", &ctx)
            .await;
        let prompt = &llm.prompts().await[0];
        let year = now_in_timezone("Europe/Belgrade").format("%Y").to_string();

        assert!(prompt.contains(&format!("The current year is {}", year)));
        assert!(prompt.contains("last bookable time is 21:00"));
        assert!(prompt.contains("Reply only in English"));
        assert!(prompt.contains("regular guest"));
        assert!(prompt.contains("party of 4"));
        assert!(prompt.contains("time 19:00"));
        assert!(!prompt.contains("FINAL BOOKING DIRECTIVE"));

        let slots = response.next_state.unwrap().slots().cloned().unwrap();
        assert_eq!(slots.time.as_deref(), Some("19:00"));
        assert!(slots.date.is_some());
    }

    #[tokio::test]
    async fn test_bare_hour_read_inside_opening_hours() {
        let llm = MockAiService::new(vec![MockReply::Text("For how many guests?".into())]);
        let agent = sofia(llm.clone());

        let response = agent.handle_message("a table on July 15 at 8", &context()).await;
        let slots = response.next_state.unwrap().slots().cloned().unwrap();
        assert_eq!(slots.time.as_deref(), Some("20:00"));
        assert!(slots.date.as_deref().is_some_and(|d| d.ends_with("-07-15")));
        assert!(llm.prompts().await[0].contains("time 20:00"));
    }

    #[tokio::test]
    async fn test_final_directive_once_slots_complete() {
        let llm = MockAiService::new(vec![MockReply::Text("Let me check.".into())]);
        let agent = sofia(llm.clone());
        let ctx = context().with_state(ConversationState::Gathering {
            slots: GatheringInfo {
                date: Some("2030-07-14".into()),
                time: Some("19:00".into()),
                guests: Some(2),
                name: Some("Anna".into()),
                ..Default::default()
            },
        });

        agent.handle_message("my phone is +381 60 555 1234", &ctx).await;
        let prompt = &llm.prompts().await[0];
        assert!(prompt.contains("FINAL BOOKING DIRECTIVE"));
        assert!(prompt.contains("phone: +381 60 555 1234"));
        assert!(prompt.contains("date: 2030-07-14"));
    }

    #[tokio::test]
    async fn test_llm_failure_becomes_apology() {
        let agent = sofia(MockAiService::new(vec![MockReply::Fail("timeout".into())]));
        let response = agent.handle_message("table for 2", &context()).await;
        assert!(response.content.starts_with("I'm sorry"));
        assert!(response.error.is_some());
    }

    #[test]
    fn test_overnight_hours_described() {
        let mut restaurant = crate::testing::demo_restaurant();
        restaurant.opening_time = "18:00".into();
        restaurant.closing_time = "02:00".into();
        let agent = sofia(MockAiService::new(vec![]));
        let section = agent.hours_section(&restaurant);
        assert!(section.contains("past midnight"));
        assert!(section.contains("last bookable time is 00:00"));
    }
}

//! Conductor: small talk and hand-offs once a task is finished
//!
//! The conductor holds no booking tools. When the guest starts a new task it
//! answers with a [`Handoff`](crate::agents::Handoff) instead of attempting it.

use crate::agents::{
    Agent, AgentConfig, AgentContext, AgentResponse, AgentStats, AgentType, BaseAgent,
};
use crate::factory::AgentServices;
use crate::health::HealthReport;
use crate::locale::{self, Text};
use crate::message_analysis::{has_cancel_intent, has_change_intent};
use crate::state::ConversationState;
use async_trait::async_trait;
use maitre_common::{RestaurantConfig, Result, TenantContext};
use maitre_llm::ToolDefinition;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::info;

static NEW_BOOKING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bbook\b|\breserve\b|\btable for\b|\banother table\b|\bnew (reservation|booking)\b|забронир|столик|rezervis|rezerviš|\bsto za\b|foglal|asztal|reservier|\btisch\b|réserv|\bune table\b|reservar|\bmesa\b|prenot|\btavolo\b|reserveer|\btafel\b",
    )
    .expect("booking intent regex is valid")
});

static GRATITUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bthank|\bthanks\b|\bthx\b|\bbye\b|goodbye|спасибо|благодар|до свидания|hvala|doviđenja|довиђења|хвала|köszön|viszlát|danke|tschüss|merci|au revoir|gracias|adiós|grazie|arrivederci|\bciao\b|obrigad|tchau|bedankt|dank je|tot ziens",
    )
    .expect("gratitude regex is valid")
});

/// What the guest is doing after a finished task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    ManageExisting,
    NewBooking,
    Gratitude,
    Conversation,
}

fn classify(message: &str, ctx: &AgentContext) -> Turn {
    if has_change_intent(message, ctx.language) || has_cancel_intent(message, ctx.language) {
        Turn::ManageExisting
    } else if NEW_BOOKING.is_match(message) {
        Turn::NewBooking
    } else if GRATITUDE.is_match(message) {
        Turn::Gratitude
    } else {
        Turn::Conversation
    }
}

/// Post-task specialist
pub struct ConductorAgent {
    base: BaseAgent,
}

impl ConductorAgent {
    pub fn new(config: AgentConfig, restaurant: Arc<RestaurantConfig>, services: AgentServices) -> Self {
        Self {
            base: BaseAgent::new(AgentType::Conductor, config, restaurant, services),
        }
    }

    async fn process(&self, message: &str, ctx: &AgentContext) -> Result<AgentResponse> {
        let turn = classify(message, ctx);
        match turn {
            Turn::ManageExisting => Ok(self.handoff(
                AgentType::Reservations,
                "existing_reservation_request",
                Text::HandoffReservations,
                ConversationState::Modifying {
                    reservation_id: ctx.state.reservation_id(),
                },
                ctx,
            )),
            Turn::NewBooking => Ok(self.handoff(
                AgentType::Booking,
                "new_booking_request",
                Text::HandoffBooking,
                ConversationState::Idle,
                ctx,
            )),
            Turn::Gratitude => Ok(AgentResponse::new(
                AgentType::Conductor,
                locale::text(ctx.language, Text::ThanksReply),
            )
            .with_decision("gratitude")),
            Turn::Conversation => {
                let prompt = self.generate_system_prompt(ctx);
                let reply = self.base.converse(prompt, message, ctx, Vec::new()).await?;
                Ok(AgentResponse::new(AgentType::Conductor, reply.text.unwrap_or_default())
                    .with_decision("conversation"))
            }
        }
    }

    fn handoff(
        &self,
        to: AgentType,
        reason: &str,
        text: Text,
        next_state: ConversationState,
        ctx: &AgentContext,
    ) -> AgentResponse {
        info!(
            event = "agent_handoff",
            restaurant_id = ctx.restaurant_id,
            from = %AgentType::Conductor,
            to = %to,
            reason,
            "Handing conversation over"
        );
        AgentResponse::new(AgentType::Conductor, locale::text(ctx.language, text))
            .with_handoff(to, reason)
            .with_decision("handoff")
            .with_next_state(next_state)
    }
}

#[async_trait]
impl Agent for ConductorAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Conductor
    }

    fn name(&self) -> &str {
        &self.base.config().name
    }

    fn config(&self) -> &AgentConfig {
        self.base.config()
    }

    fn generate_system_prompt(&self, ctx: &AgentContext) -> String {
        let r = self.base.restaurant();
        let optional = |label: &str, value: &Option<String>| {
            value
                .as_deref()
                .map(|v| format!("\n- {}: {}", label, v))
                .unwrap_or_default()
        };

        format!(
            "You are the host of {}. The guest's request has been handled; keep the conversation \
             friendly and brief.\n\n\
             LANGUAGE: Reply only in {}.\n\n\
             RESTAURANT FACTS:\n- hours: {} to {} ({}){}{}{}{}\n\n\
             RULES:\n\
             - Answer simple questions about the restaurant using only the facts above.\n\
             - You cannot make, change or cancel reservations. If the guest asks, say a colleague will help.\n\
             - Never invent facts that are not listed.",
            r.name,
            ctx.language.display_name(),
            r.opening_time,
            r.closing_time,
            r.timezone,
            optional("cuisine", &r.cuisine),
            optional("atmosphere", &r.atmosphere),
            optional("address", &r.address),
            optional("phone", &r.phone),
        )
    }

    async fn handle_message(&self, message: &str, ctx: &AgentContext) -> AgentResponse {
        match self.process(message, ctx).await {
            Ok(response) => response,
            Err(e) => self
                .base
                .handle_agent_error(&e, "conductor.handle_message", ctx.language),
        }
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    async fn health_check(&self, tenant: &TenantContext) -> HealthReport {
        self.base.health_check(tenant, &self.tools()).await
    }

    fn stats(&self) -> AgentStats {
        self.base.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockAiService, MockReply, MockToolExecutor, agent_parts, context};
    use maitre_common::Language;

    fn conductor(llm: Arc<MockAiService>) -> ConductorAgent {
        let (config, restaurant, services) =
            agent_parts(AgentType::Conductor, llm, MockToolExecutor::new());
        ConductorAgent::new(config, restaurant, services)
    }

    #[tokio::test]
    async fn test_thanks_needs_no_model() {
        let llm = MockAiService::new(vec![]);
        let agent = conductor(llm.clone());

        let response = agent.handle_message("Thank you so much!", &context()).await;
        assert!(response.content.contains("You're very welcome"));
        assert!(response.handoff.is_none());
        assert!(llm.prompts().await.is_empty());
    }

    #[tokio::test]
    async fn test_new_booking_hands_off_to_sofia() {
        let agent = conductor(MockAiService::new(vec![]));
        let response = agent
            .handle_message("Thanks! Can I book another table for Friday?", &context())
            .await;
        let handoff = response.handoff.expect("handoff");
        assert_eq!(handoff.to, AgentType::Booking);
        assert!(response.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_hands_off_to_maya() {
        let mut ctx = context();
        ctx.language = Language::Ru;
        let agent = conductor(MockAiService::new(vec![]));

        let response = agent.handle_message("Хочу отменить бронь", &ctx).await;
        assert_eq!(response.handoff.unwrap().to, AgentType::Reservations);
        assert!(response.content.starts_with("Конечно"));
    }

    #[tokio::test]
    async fn test_info_question_uses_model_without_tools() {
        let llm = MockAiService::new(vec![MockReply::Text("We are at Knez Mihailova 1.".into())]);
        let agent = conductor(llm.clone());

        let response = agent.handle_message("Where are you located?", &context()).await;
        assert_eq!(response.content, "We are at Knez Mihailova 1.");
        assert!(agent.tools().is_empty());
        assert!(llm.prompts().await[0].contains("address: Knez Mihailova 1"));
    }
}

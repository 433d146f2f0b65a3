//! Apollo: recovers a booking after the requested slot turned out to be taken

use crate::agents::{
    Agent, AgentConfig, AgentContext, AgentResponse, AgentStats, AgentType, BaseAgent,
};
use crate::alternatives::{RankedAlternative, parse_preference, rank_alternatives};
use crate::factory::AgentServices;
use crate::health::HealthReport;
use crate::locale::{self, Text};
use crate::message_analysis::extract_time_for;
use crate::state::{ConversationState, FailureContext, GatheringInfo};
use async_trait::async_trait;
use chrono::NaiveTime;
use maitre_common::{
    Language, MAX_PRESENTED_ALTERNATIVES, MaitreError, RestaurantConfig, Result, TenantContext,
    parse_time,
};
use maitre_llm::{ToolCall, ToolDefinition};
use maitre_tools::{BookingTool, tools_for};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

const APOLLO_TOOLS: &[BookingTool] = &[
    BookingTool::CheckAvailability,
    BookingTool::FindAlternativeTimes,
    BookingTool::GetRestaurantInfo,
];

/// Availability-recovery specialist
pub struct ApolloAgent {
    base: BaseAgent,
}

impl ApolloAgent {
    pub fn new(config: AgentConfig, restaurant: Arc<RestaurantConfig>, services: AgentServices) -> Self {
        Self {
            base: BaseAgent::new(AgentType::Availability, config, restaurant, services),
        }
    }

    async fn process(&self, message: &str, ctx: &AgentContext) -> Result<AgentResponse> {
        let Some(failure) = &ctx.failure_context else {
            debug!(restaurant_id = ctx.restaurant_id, "No failure context, asking for the original request");
            return Ok(AgentResponse::new(
                AgentType::Availability,
                locale::text(ctx.language, Text::AskOriginalRequest),
            )
            .with_decision("missing_failure_context"));
        };

        // The guest named a time of their own: let the model check it
        if let Some(time) = extract_time_for(message, self.base.restaurant()).filter(|t| *t != failure.time) {
            return self.model_turn(message, ctx, failure, &time).await;
        }

        let original = parse_time(&failure.time).ok_or_else(|| {
            MaitreError::validation(format!("Invalid original time '{}'", failure.time), "19:00")
        })?;
        let candidates = self.search_alternatives(failure, ctx).await?;
        let preference = parse_preference(message);
        let ranked = rank_alternatives(original, &failure.date, &candidates, &preference, ctx.language);

        info!(
            event = "alternatives_ranked",
            restaurant_id = ctx.restaurant_id,
            candidates = candidates.len(),
            presented = ranked.len(),
            "Ranked alternative times"
        );

        let slots = GatheringInfo {
            date: Some(failure.date.clone()),
            guests: Some(failure.guests),
            ..Default::default()
        };

        if ranked.is_empty() {
            let content = locale::render(
                ctx.language,
                Text::NoAlternatives,
                &[("time", &failure.time), ("date", &failure.date)],
            );
            return Ok(AgentResponse::new(AgentType::Availability, content)
                .with_decision("no_alternatives")
                .with_next_state(ConversationState::Gathering { slots }));
        }

        Ok(AgentResponse::new(
            AgentType::Availability,
            present_alternatives(&ranked, failure, ctx.language),
        )
        .with_decision("alternatives_ranked")
        .with_confidence(ranked[0].score / 100.0)
        .with_alternatives(ranked)
        .with_next_state(ConversationState::Gathering { slots }))
    }

    async fn search_alternatives(
        &self,
        failure: &FailureContext,
        ctx: &AgentContext,
    ) -> Result<Vec<NaiveTime>> {
        let call = ToolCall::new(
            BookingTool::FindAlternativeTimes.name(),
            json!({
                "date": failure.date,
                "preferredTime": failure.time,
                "guests": failure.guests,
            }),
        );
        let data = self.base.execute_tool(&call, ctx).await.into_result()?;

        Ok(data
            .get("alternatives")
            .and_then(Value::as_array)
            .map(|alternatives| {
                alternatives
                    .iter()
                    .filter(|a| {
                        a.get("date")
                            .and_then(Value::as_str)
                            .is_none_or(|d| d == failure.date)
                    })
                    .filter_map(|a| a.get("time").and_then(Value::as_str))
                    .filter_map(parse_time)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn model_turn(
        &self,
        message: &str,
        ctx: &AgentContext,
        failure: &FailureContext,
        requested_time: &str,
    ) -> Result<AgentResponse> {
        let prompt = format!(
            "{}\n\nThe guest now asks about {} on {} for {} guests. Check it with check_availability \
             before saying whether it is free.",
            self.generate_system_prompt(ctx),
            requested_time,
            failure.date,
            failure.guests
        );
        let turn = self.base.converse(prompt, message, ctx, self.tools()).await?;

        let slots = GatheringInfo {
            date: Some(failure.date.clone()),
            time: Some(requested_time.to_string()),
            guests: Some(failure.guests),
            ..Default::default()
        };
        Ok(AgentResponse::new(AgentType::Availability, turn.text.unwrap_or_default())
            .with_tool_calls(turn.tool_calls)
            .with_decision("guest_proposed_time")
            .with_next_state(ConversationState::Gathering { slots }))
    }
}

#[async_trait]
impl Agent for ApolloAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Availability
    }

    fn name(&self) -> &str {
        &self.base.config().name
    }

    fn config(&self) -> &AgentConfig {
        self.base.config()
    }

    fn generate_system_prompt(&self, ctx: &AgentContext) -> String {
        let restaurant = self.base.restaurant();
        let mut prompt = format!(
            "You are {}, the availability specialist at {}. A requested time was not available \
             and your job is to find the best alternatives.\n\n\
             LANGUAGE: Reply only in {}. Never switch languages during the conversation.\n\n\
             HOURS: {} to {} ({}).\n\n\
             RULES:\n\
             - Present at most {} options, best first, each with a short reason.\n\
             - Prefer times close to the original request; respect 'earlier' or 'later' wishes.\n\
             - Never claim a time is free without checking it.",
            self.name(),
            restaurant.name,
            ctx.language.display_name(),
            restaurant.opening_time,
            restaurant.closing_time,
            restaurant.timezone,
            MAX_PRESENTED_ALTERNATIVES
        );
        match &ctx.failure_context {
            Some(failure) => prompt.push_str(&format!(
                "\n\nORIGINAL REQUEST: {} at {} for {} guests. It failed because: {}.",
                failure.date, failure.time, failure.guests, failure.reason
            )),
            None => prompt.push_str(
                "\n\nThe original request is unknown. Ask for the date, time and party size first.",
            ),
        }
        prompt
    }

    async fn handle_message(&self, message: &str, ctx: &AgentContext) -> AgentResponse {
        match self.process(message, ctx).await {
            Ok(response) => response,
            Err(e) => self
                .base
                .handle_agent_error(&e, "apollo.handle_message", ctx.language),
        }
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        tools_for(APOLLO_TOOLS)
    }

    async fn health_check(&self, tenant: &TenantContext) -> HealthReport {
        self.base.health_check(tenant, &self.tools()).await
    }

    fn stats(&self) -> AgentStats {
        self.base.stats()
    }
}

fn present_alternatives(ranked: &[RankedAlternative], failure: &FailureContext, language: Language) -> String {
    let intro = locale::render(
        language,
        Text::AlternativesIntro,
        &[("time", &failure.time), ("date", &failure.date)],
    );
    let options: Vec<String> = ranked
        .iter()
        .enumerate()
        .map(|(i, alt)| format!("{}. {} ({})", i + 1, alt.time, alt.justification))
        .collect();
    format!(
        "{}\n{}\n\n{}",
        intro,
        options.join("\n"),
        locale::text(language, Text::AlternativesQuestion)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockAiService, MockReply, MockToolExecutor, agent_parts, context};
    use maitre_common::{ReservationStatus, ReservationSummary};

    fn apollo(llm: Arc<MockAiService>, executor: Arc<MockToolExecutor>) -> ApolloAgent {
        let (config, restaurant, services) = agent_parts(AgentType::Availability, llm, executor);
        ApolloAgent::new(config, restaurant, services)
    }

    fn failure() -> FailureContext {
        FailureContext {
            date: "2030-07-14".into(),
            time: "19:00".into(),
            guests: 2,
            reason: "NO_AVAILABILITY".into(),
        }
    }

    async fn fully_booked_at_seven() -> Arc<MockToolExecutor> {
        let executor = MockToolExecutor::new();
        for id in [1, 2] {
            executor
                .book
                .insert(ReservationSummary {
                    id,
                    guest_name: format!("Guest {}", id),
                    guest_phone: None,
                    date: "2030-07-14".into(),
                    time: "19:00".into(),
                    guests: 2,
                    status: ReservationStatus::Confirmed,
                    special_requests: None,
                    table_name: None,
                })
                .await;
        }
        executor
    }

    #[tokio::test]
    async fn test_missing_failure_context_asks_for_request() {
        let llm = MockAiService::new(vec![]);
        let agent = apollo(llm.clone(), MockToolExecutor::new());

        let response = agent.handle_message("anything else?", &context()).await;
        assert!(response.content.contains("date, time and number of guests"));
        assert_eq!(
            response.metadata.decision.as_deref(),
            Some("missing_failure_context")
        );
        assert!(llm.prompts().await.is_empty());
    }

    #[tokio::test]
    async fn test_alternatives_ranked_and_capped() {
        let agent = apollo(MockAiService::new(vec![]), fully_booked_at_seven().await);
        let ctx = context().with_failure_context(failure());

        let response = agent.handle_message("what else do you have?", &ctx).await;
        let times: Vec<_> = response.alternatives.iter().map(|a| a.time.as_str()).collect();
        assert_eq!(times, vec!["17:00", "21:00", "16:45"]);
        assert_eq!(response.alternatives[0].justification, "quieter, more intimate");
        assert!(response.content.contains("1. 17:00"));
        assert!(response.content.contains("Which one would you prefer?"));
    }

    #[tokio::test]
    async fn test_later_preference_changes_order() {
        let agent = apollo(MockAiService::new(vec![]), fully_booked_at_seven().await);
        let ctx = context().with_failure_context(failure());

        let response = agent.handle_message("anything later?", &ctx).await;
        assert_eq!(response.alternatives[0].time, "21:00");
        assert_eq!(response.alternatives[0].justification, "relaxed late dining");
    }

    #[tokio::test]
    async fn test_no_alternatives() {
        let executor = MockToolExecutor::new();
        let agent = apollo(MockAiService::new(vec![]), executor);
        let mut failed = failure();
        failed.guests = 30;
        let ctx = context().with_failure_context(failed);

        let response = agent.handle_message("ok", &ctx).await;
        assert!(response.alternatives.is_empty());
        assert!(response.content.contains("couldn't find a free table"));
    }

    #[tokio::test]
    async fn test_guest_time_goes_to_model() {
        let llm = MockAiService::new(vec![MockReply::Text("Let me check 20:45.".into())]);
        let agent = apollo(llm.clone(), MockToolExecutor::new());
        let ctx = context().with_failure_context(failure());

        let response = agent.handle_message("what about 20:45?", &ctx).await;
        assert_eq!(response.content, "Let me check 20:45.");
        let slots = response.next_state.unwrap().slots().cloned().unwrap();
        assert_eq!(slots.time.as_deref(), Some("20:45"));
        assert!(llm.prompts().await[0].contains("ORIGINAL REQUEST: 2030-07-14 at 19:00"));
    }
}

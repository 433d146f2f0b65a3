//! Scripted collaborators shared by the agent tests

use crate::agents::{AgentConfig, AgentContext, AgentType, BaseAgent};
use crate::factory::AgentServices;
use async_trait::async_trait;
use maitre_common::{
    Language, MaitreConfig, MaitreError, Result, RestaurantConfig, TenantContext, TenantPlan,
    TenantStatus, features,
};
use maitre_llm::{AiService, ChatTurnRequest, GenerationOptions, LlmTurn, ToolCall, extract_json};
use maitre_storage::{InMemoryContextManager, InMemoryRestaurantStore, RestaurantRow};
use maitre_tools::{InMemoryReservationBook, ToolContext, ToolEnvelope, ToolExecutor};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const TIMEZONE: &str = "Europe/Belgrade";

/// One scripted provider answer
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Json(Value),
    Turn(LlmTurn),
    Fail(String),
}

/// LLM double answering from a queue and recording every prompt
pub struct MockAiService {
    replies: Mutex<VecDeque<MockReply>>,
    prompts: Mutex<Vec<String>>,
}

impl MockAiService {
    pub fn new(replies: Vec<MockReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    async fn next(&self, prompt: String) -> Result<MockReply> {
        self.prompts.lock().await.push(prompt);
        match self.replies.lock().await.pop_front() {
            Some(MockReply::Fail(message)) => Err(MaitreError::Llm(message)),
            Some(reply) => Ok(reply),
            None => Err(MaitreError::Llm("no scripted reply".to_string())),
        }
    }
}

#[async_trait]
impl AiService for MockAiService {
    async fn generate_content(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
        _tenant: &TenantContext,
    ) -> Result<String> {
        match self.next(prompt.to_string()).await? {
            MockReply::Text(text) => Ok(text),
            MockReply::Json(value) => Ok(value.to_string()),
            MockReply::Turn(turn) => Ok(turn.text.unwrap_or_default()),
            MockReply::Fail(message) => Err(MaitreError::Llm(message)),
        }
    }

    async fn generate_json(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
        _tenant: &TenantContext,
    ) -> Result<Value> {
        match self.next(prompt.to_string()).await? {
            MockReply::Json(value) => Ok(value),
            MockReply::Text(text) => extract_json(&text),
            MockReply::Turn(turn) => extract_json(&turn.text.unwrap_or_default()),
            MockReply::Fail(message) => Err(MaitreError::Llm(message)),
        }
    }

    async fn generate_turn(
        &self,
        request: &ChatTurnRequest,
        _options: &GenerationOptions,
        _tenant: &TenantContext,
    ) -> Result<LlmTurn> {
        let prompt = format!("{}\n---\n{}", request.system_prompt, request.message);
        match self.next(prompt).await? {
            MockReply::Turn(turn) => Ok(turn),
            MockReply::Text(text) => Ok(LlmTurn::text(text)),
            MockReply::Json(value) => Ok(LlmTurn::text(value.to_string())),
            MockReply::Fail(message) => Err(MaitreError::Llm(message)),
        }
    }
}

/// Reservation book that remembers which tools were called
pub struct MockToolExecutor {
    pub book: InMemoryReservationBook,
    calls: Mutex<Vec<ToolCall>>,
}

impl MockToolExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            book: InMemoryReservationBook::new(demo_restaurant(), 2),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub async fn called(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolEnvelope {
        self.calls.lock().await.push(call.clone());
        self.book.execute(call, ctx).await
    }

    fn supported_tools(&self) -> Vec<String> {
        self.book.supported_tools()
    }
}

pub fn demo_restaurant() -> RestaurantConfig {
    RestaurantConfig {
        id: 1,
        name: "Demo Bistro".into(),
        timezone: TIMEZONE.into(),
        opening_time: "10:00".into(),
        closing_time: "23:00".into(),
        max_guests: 8,
        avg_reservation_duration: 120,
        cuisine: Some("Balkan".into()),
        atmosphere: Some("cosy".into()),
        country: Some("Serbia".into()),
        languages: vec!["en".into(), "sr".into(), "ru".into()],
        phone: Some("+381 11 000 000".into()),
        address: Some("Knez Mihailova 1".into()),
    }
}

pub fn restaurant_row(id: i64) -> RestaurantRow {
    RestaurantRow {
        id,
        name: format!("Restaurant {}", id),
        timezone: Some(TIMEZONE.into()),
        ..Default::default()
    }
}

pub fn restaurant_store(ids: &[i64]) -> Arc<InMemoryRestaurantStore> {
    Arc::new(InMemoryRestaurantStore::with_rows(
        ids.iter().map(|id| restaurant_row(*id)),
    ))
}

pub fn tenant(restaurant_id: i64, plan: TenantPlan) -> TenantContext {
    TenantContext::new(
        restaurant_id,
        format!("Restaurant {}", restaurant_id),
        TenantStatus::Active,
        plan,
    )
    .with_feature(features::ADVANCED_AVAILABILITY, plan != TenantPlan::Starter)
}

pub fn context() -> AgentContext {
    AgentContext::new(tenant(1, TenantPlan::Professional), TIMEZONE, Language::En)
}

pub fn services(llm: Arc<MockAiService>, executor: Arc<MockToolExecutor>) -> AgentServices {
    AgentServices {
        llm,
        context: Arc::new(InMemoryContextManager::new()),
        executor,
    }
}

pub fn agent_parts(
    agent_type: AgentType,
    llm: Arc<MockAiService>,
    executor: Arc<MockToolExecutor>,
) -> (AgentConfig, Arc<RestaurantConfig>, AgentServices) {
    (
        AgentConfig::for_type(agent_type, &MaitreConfig::default()),
        Arc::new(demo_restaurant()),
        services(llm, executor),
    )
}

pub fn base_agent(agent_type: AgentType, llm: Arc<MockAiService>) -> BaseAgent {
    let (config, restaurant, services) = agent_parts(agent_type, llm, MockToolExecutor::new());
    BaseAgent::new(agent_type, config, restaurant, services)
}

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::*;
use maitre_framework::prelude::*;
use maitre_framework::llm::ChatMessage;
use regex::Regex;
use serde_json::Value;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use termimad::MadSkin;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command-line arguments for the Maitre CLI
#[derive(Parser)]
#[command(
    name = "maitre",
    about = "Maitre - talk to the restaurant booking agents from your terminal"
)]
pub struct Args {
    /// JSON file with restaurant rows
    #[clap(long, default_value = "./demos/restaurants.json")]
    restaurants: PathBuf,

    /// Restaurant to talk to
    #[clap(long, default_value_t = 1)]
    restaurant_id: i64,

    /// Agent to start with (booking, reservations, availability, conductor)
    #[clap(long, default_value = "booking", short_alias = 'a')]
    agent: String,

    /// Tenant plan (starter, professional, enterprise)
    #[clap(long, default_value = "professional")]
    plan: String,

    /// Guest language code
    #[clap(long, default_value = "en")]
    language: String,

    /// Model override for the primary model
    #[clap(long)]
    model: Option<String>,

    /// Path to a maitre.toml configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// Number of tables in the in-memory reservation book
    #[clap(long, default_value_t = 10)]
    tables: usize,

    /// Enable debug mode
    #[clap(short, long)]
    debug: bool,

    /// List available agents
    #[clap(long)]
    list_agents: bool,
}

/// Replace Markdown links with OSC 8 hyperlinks for supported terminals.
fn add_osc8_hyperlinks(input: &str) -> String {
    let Ok(re) = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)") else {
        return input.to_string();
    };
    re.replace_all(input, |caps: &regex::Captures| {
        let text = &caps[1];
        let url = &caps[2];
        format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, text)
    })
    .to_string()
}

fn list_agents() {
    println!("{}", "🤖 Available Maitre Agents:".bright_cyan().bold());
    println!();
    for agent_type in AgentType::ALL {
        println!(
            "• {} ({}) - {}",
            agent_type.persona().bright_green().bold(),
            agent_type.as_str().bright_blue(),
            agent_type.description()
        );
    }
}

/// Display agent information
fn display_agent_info(agent: &dyn Agent) {
    println!();
    println!("{}", "🤖 Agent Information".bright_cyan().bold());
    println!("{} {}", "Name:".bright_yellow(), agent.name().bright_green().bold());
    println!(
        "{} {}",
        "Role:".bright_yellow(),
        agent.config().description.bright_magenta()
    );

    let tools: Vec<String> = agent.tools().into_iter().map(|t| t.name).collect();
    if tools.is_empty() {
        println!("{} {}", "Tools:".bright_yellow(), "none (hands off new requests)".bright_cyan());
    } else {
        println!("{} {}", "Tools:".bright_yellow(), tools.join(", ").bright_cyan());
    }
    println!();
}

/// What the driver carries between turns
struct Conversation {
    agent_type: AgentType,
    state: ConversationState,
    history: Vec<ChatMessage>,
    failure: Option<FailureContext>,
}

struct Driver {
    factory: Arc<AgentFactory>,
    book: Arc<InMemoryReservationBook>,
    tenant: TenantContext,
    timezone: String,
    language: Language,
    skin: MadSkin,
}

impl Driver {
    async fn switch_to(&self, conversation: &mut Conversation, to: AgentType) {
        match self.factory.create_agent(to, &self.tenant, None).await {
            Ok(agent) => {
                conversation.agent_type = to;
                println!(
                    "{}",
                    format!("↪ {} takes over", agent.name()).bright_yellow()
                );
            }
            Err(e) => {
                warn!(agent_type = %to, error = %e, "Handoff refused");
                println!("{}", format!("⚠ {}", e).yellow());
            }
        }
    }

    /// Run emitted tool calls against the in-memory book and react to outcomes
    async fn run_tools(&self, conversation: &mut Conversation, response: &AgentResponse) {
        let tool_ctx = ToolContext {
            restaurant_id: self.tenant.restaurant_id,
            timezone: self.timezone.clone(),
            language: self.language,
            session_id: None,
            tenant: self.tenant.clone(),
        };

        for call in &response.tool_calls {
            println!(
                "{} {} {}",
                "🔧".bright_blue(),
                call.name.bright_blue().bold(),
                call.arguments.to_string().dimmed()
            );
            let envelope = self.book.execute(call, &tool_ctx).await;
            let rendered = serde_json::to_string_pretty(&envelope).unwrap_or_default();
            println!("{}", rendered.dimmed());

            let failed_code = envelope.error.as_ref().and_then(|e| e.code.as_deref());
            if call.name == BookingTool::CheckAvailability.name() && failed_code == Some("NO_AVAILABILITY") {
                conversation.failure = failure_from_args(&call.arguments);
                self.switch_to(conversation, AgentType::Availability).await;
            }

            if call.name == BookingTool::CreateReservation.name() && envelope.is_success() {
                let reservation_id = envelope
                    .data
                    .as_ref()
                    .and_then(|d| d.get("reservationId"))
                    .and_then(Value::as_i64);
                conversation.state = ConversationState::Completed { reservation_id };
                conversation.failure = None;
                self.switch_to(conversation, AgentType::Conductor).await;
            }
        }
    }

    async fn turn(&self, conversation: &mut Conversation, input: &str) -> Result<()> {
        let agent = self
            .factory
            .create_agent(conversation.agent_type, &self.tenant, None)
            .await?;

        let mut ctx = AgentContext::new(self.tenant.clone(), self.timezone.clone(), self.language)
            .with_state(conversation.state.clone())
            .with_history(conversation.history.clone());
        if let Some(failure) = &conversation.failure {
            ctx = ctx.with_failure_context(failure.clone());
        }

        print!("{}", format!("{}: ", agent.name()).bright_green().bold());
        io::stdout().flush()?;

        let response = agent.handle_message(input, &ctx).await;
        if let Some(err) = &response.error {
            warn!(kind = ?err.kind, recoverable = err.recoverable, "Agent reported an error");
        }
        let formatted = add_osc8_hyperlinks(&response.content);
        println!("{}", self.skin.term_text(&formatted));

        conversation.history.push(ChatMessage::User(input.to_string()));
        conversation
            .history
            .push(ChatMessage::Assistant(response.content.clone()));
        if let Some(next) = &response.next_state {
            conversation.state = next.clone();
        }

        if let Some(handoff) = &response.handoff {
            info!(to = %handoff.to, reason = %handoff.reason, "Following handoff");
            self.switch_to(conversation, handoff.to).await;
        }

        self.run_tools(conversation, &response).await;
        Ok(())
    }
}

fn failure_from_args(args: &Value) -> Option<FailureContext> {
    Some(FailureContext {
        date: args.get("date")?.as_str()?.to_string(),
        time: args.get("time")?.as_str()?.to_string(),
        guests: u32::try_from(args.get("guests")?.as_u64()?).ok()?,
        reason: "NO_AVAILABILITY".to_string(),
    })
}

async fn conversation_loop(driver: &Driver, start: AgentType) -> Result<()> {
    let agent = driver.factory.create_agent(start, &driver.tenant, None).await?;
    display_agent_info(agent.as_ref());

    println!(
        "{}",
        "💬 Starting conversation. Type 'quit' or 'exit' to stop.".bright_green()
    );
    println!("{}", "Type '/stats' to show factory statistics.".bright_yellow());
    println!();

    let mut conversation = Conversation {
        agent_type: start,
        state: ConversationState::Idle,
        history: Vec::new(),
        failure: None,
    };

    loop {
        print!("{}", "You: ".bright_cyan().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" => {
                println!("{}", "👋 Goodbye!".bright_green());
                break;
            }
            "/stats" => {
                let stats = driver.factory.stats().await;
                println!("{}", serde_json::to_string_pretty(&stats)?.dimmed());
                continue;
            }
            _ => {}
        }

        if let Err(e) = driver.turn(&mut conversation, input).await {
            error!("Turn failed: {}", e);
            println!("{}", format!("❌ {}", e).red());
        }
        println!();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Setup tracing
    let default_level = if args.debug { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.list_agents {
        list_agents();
        return Ok(());
    }

    let mut settings = match &args.config {
        Some(path) => MaitreConfig::from_toml_file(path)?,
        None => MaitreConfig::default(),
    };
    if let Some(model) = &args.model {
        settings.provider.primary_model = model.clone();
    }

    let start: AgentType = args.agent.parse()?;
    let plan = TenantPlan::from_name(&args.plan)
        .ok_or_else(|| anyhow!("Unknown plan '{}'", args.plan))?;
    let language = Language::from_code(&args.language)
        .ok_or_else(|| anyhow!("Unsupported language '{}'", args.language))?;

    let store = Arc::new(
        InMemoryRestaurantStore::from_json_file(&args.restaurants)
            .with_context(|| format!("loading {}", args.restaurants.display()))?,
    );
    let configs = Arc::new(RestaurantConfigManager::new(store));
    let restaurant = configs.get_config(args.restaurant_id).await?;

    let tenant = TenantContext::new(
        restaurant.id,
        restaurant.name.clone(),
        TenantStatus::Active,
        plan,
    )
    .with_feature(maitre_framework::common::features::ADVANCED_AVAILABILITY, plan >= TenantPlan::Professional)
    .with_feature(maitre_framework::common::features::MULTI_LANGUAGE, true);

    let book = Arc::new(InMemoryReservationBook::new((*restaurant).clone(), args.tables));
    let services = AgentServices {
        llm: Arc::new(GenaiService::new()),
        context: Arc::new(InMemoryContextManager::new()),
        executor: book.clone(),
    };
    let factory = AgentFactory::new(settings.clone(), configs, services);
    factory.start_health_monitor();

    info!("Starting Maitre CLI");
    info!("Restaurant: {} ({})", restaurant.name, restaurant.timezone);
    info!("Model: {}", settings.provider.primary_model);

    let driver = Driver {
        factory: factory.clone(),
        book,
        tenant,
        timezone: restaurant.timezone.clone(),
        language,
        skin: MadSkin::default(),
    };

    let result = conversation_loop(&driver, start).await;
    factory.shutdown();
    result
}

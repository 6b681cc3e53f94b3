use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use switchboard_core::config::AppConfig;
use switchboard_core::event::EventBus;
use switchboard_core::traits::Handler;
use switchboard_core::types::GraphEvent;
use switchboard_gateway::GatewayServer;
use switchboard_graph::{
    structure_prompt, AgentRoster, ConnectivityGraph, ConversationGraph, SessionManager,
};
use switchboard_llm::{LlmHandler, OpenAiClient};

#[derive(Parser)]
#[command(
    name = "switchboard",
    version,
    about = "Route a conversation across a graph of cooperating agents"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "switchboard.toml", env = "SWITCHBOARD_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation
    Chat,
    /// Send a single message and exit
    Run {
        /// The message to send to the root agent
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Start the HTTP gateway
    Serve,
    /// List configured agents
    Agents,
    /// Show the shortest route between two agents
    Route { from: String, to: String },
    /// Print the generated GRAPH STRUCTURE prompt section
    Structure,
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("switchboard=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "switchboard", &mut io::stdout());
        return Ok(());
    }

    let config = AppConfig::load(&cli.config)?;
    let base_dir = config_dir(&cli.config);

    match cli.command {
        Some(Commands::Config) => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Some(Commands::Agents) => {
            let descriptors = config.agent_descriptors(&base_dir)?;
            ConnectivityGraph::build(&descriptors)?;
            for d in &descriptors {
                let role = if d.is_root {
                    "root".to_string()
                } else {
                    format!("parent: {}", d.parent.as_deref().unwrap_or("-"))
                };
                println!("{} ({})", d.name, role);
                for rule in d.transition_rules.iter() {
                    println!("    {} -> {}", rule.intent, rule.target);
                }
            }
        }
        Some(Commands::Route { from, to }) => {
            let graph = ConnectivityGraph::build(&config.agent_descriptors(&base_dir)?)?;
            match graph.shortest_path(&from, &to) {
                Some(path) => println!("{}", ConnectivityGraph::describe_path(&path)),
                None => println!("No path from {} to {}", from, to),
            }
        }
        Some(Commands::Structure) => {
            let descriptors = config.agent_descriptors(&base_dir)?;
            ConnectivityGraph::build(&descriptors)?;
            println!(
                "{}",
                structure_prompt(&descriptors, &config.routing.feedback_agent)
            );
        }
        Some(Commands::Run { message }) => {
            let roster = build_roster(&config, &base_dir)?;
            let mut graph = ConversationGraph::create(&roster, config.routing.clone());
            let text = message.join(" ");
            let text = if text.is_empty() {
                // Read from stdin
                io::stdin()
                    .lock()
                    .lines()
                    .map_while(|l| l.ok())
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                text
            };
            stream_turn(&mut graph, &text).await?;
            println!();
        }
        Some(Commands::Serve) => {
            let roster = build_roster(&config, &base_dir)?;
            let event_bus = Arc::new(EventBus::default());
            spawn_event_logger(&event_bus);

            let sessions = SessionManager::new(Arc::new(roster), config.routing.clone())
                .with_events(event_bus);
            let server = GatewayServer::new(config.gateway_or_default(), Arc::new(sessions));
            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
        Some(Commands::Chat) | None => {
            let roster = build_roster(&config, &base_dir)?;
            run_chat(&roster, &config).await?;
        }
        // Handled before config loading
        Some(Commands::Completions { .. }) => {}
    }

    Ok(())
}

/// Build the shared roster with one backend-backed handler per agent.
fn build_roster(config: &AppConfig, base_dir: &Path) -> anyhow::Result<AgentRoster> {
    let descriptors = config.agent_descriptors(base_dir)?;
    let structure = structure_prompt(&descriptors, &config.routing.feedback_agent);
    let embed = config.routing.embed_graph_structure;
    let client = OpenAiClient::new(config.backend.clone());

    let roster = AgentRoster::build(descriptors, |descriptor| {
        let mut handler = LlmHandler::new(descriptor, client.clone());
        if embed {
            handler = handler.with_graph_structure(&structure);
        }
        Ok(Arc::new(handler) as Arc<dyn Handler>)
    })?;
    info!(agents = roster.len(), root = %roster.root(), "Agent roster ready");
    Ok(roster)
}

async fn run_chat(roster: &AgentRoster, config: &AppConfig) -> anyhow::Result<()> {
    let mut graph = ConversationGraph::create(roster, config.routing.clone());

    println!("Switchboard v{}", env!("CARGO_PKG_VERSION"));
    println!("Model: {}", config.backend.model_id);
    println!("Type 'exit' to quit.\n");

    let stdin = io::stdin();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break; // EOF
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }

        print!("Assistant: ");
        stream_turn(&mut graph, input).await?;
        println!("\n[Active Agent: {}]\n", graph.get_current_agent());
    }

    Ok(())
}

/// Print a turn's fragments as they arrive.
async fn stream_turn(graph: &mut ConversationGraph, message: &str) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    let mut fragments = graph.process_message(message);
    while let Some(fragment) = fragments.next().await {
        print!("{}", fragment);
        stdout.flush()?;
    }
    Ok(())
}

fn spawn_event_logger(event_bus: &EventBus) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                GraphEvent::Transitioned { from, to, kind } => {
                    info!(from = %from, to = %to, kind = %kind, "Transition");
                }
                GraphEvent::TransitionSuppressed { from, target } => {
                    warn!(from = %from, target = %target, "Transition suppressed");
                }
                GraphEvent::BackendFailed { agent, error } => {
                    warn!(agent = %agent, error = %error, "Backend failed");
                }
                _ => {}
            }
        }
    });
}

fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

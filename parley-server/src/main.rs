//! CLI entry point for parley

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use parley_agent::AgentLoop;
use parley_core::config::{Config, ConfigLoader};
use parley_core::logging::{init_logging, WorkerGuard};
use parley_core::session::SessionStore;
use parley_providers::{GeminiClient, LLMProvider};
use parley_server::{run_server, AppState};
use parley_tools::builtin_registry;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Chat server for Gemini with tools and per-session history")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config.json into the configuration directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP chat server (default)
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send a single message without starting the server
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Session id for conversation continuity
        #[arg(short, long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dotenv_path = ConfigLoader::load_dotenv();

    let config_loader = match cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Init { force } => run_init(&config_loader, force),
        Commands::Serve { host, port } => {
            let (config, _guard) = load_and_init_logging(&config_loader, dotenv_path)?;
            run_serve(config, host, port).await
        }
        Commands::Ask { message, session } => {
            let (config, _guard) = load_and_init_logging(&config_loader, dotenv_path)?;
            run_ask(config, &message, session.as_deref().unwrap_or_default()).await
        }
    }
}

/// Load configuration, install logging, then report what loading skipped
fn load_and_init_logging(
    loader: &ConfigLoader,
    dotenv_path: Option<PathBuf>,
) -> Result<(Config, WorkerGuard)> {
    let (config, warnings) = loader.load_with_warnings()?;
    let guard = init_logging(&config.logging);

    match dotenv_path {
        Some(path) => info!("Loaded environment from {}", path.display()),
        None => debug!("No .env file loaded"),
    }
    for warning in &warnings {
        warn!("{}", warning);
    }

    Ok((config, guard))
}

fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let path = loader.config_dir().join("config.json");
    if path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            style("!").yellow(),
            path.display()
        );
        return Ok(());
    }

    loader.save(&Config::default())?;
    println!("{} Wrote {}", style("✓").green(), path.display());
    println!("Set GEMINI_API_KEY in the environment or a .env file before serving.");
    Ok(())
}

/// Wire provider, tools and session store into an orchestrator
fn build_agent(config: &Config) -> Result<AgentLoop> {
    let provider: Arc<dyn LLMProvider> = Arc::new(GeminiClient::from_config(&config.provider)?);
    let tools = builtin_registry(provider.clone(), config);
    let sessions = Arc::new(SessionStore::with_limit(
        config.history.max_messages,
        config.history.trim_mode,
    ));

    info!(
        "Agent ready: model {}, {} tools, history limit {} ({:?})",
        config.provider.model,
        tools.len(),
        sessions.max_messages(),
        sessions.trim_mode()
    );

    Ok(AgentLoop::new(provider, tools, sessions, &config.agent))
}

async fn run_serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", host, port))?;

    let agent = Arc::new(build_agent(&config)?);
    let state = AppState::new(agent, &config.server.chat_page);

    println!("{}", style("Starting parley server...").bold().cyan());
    println!("Model: {}", config.provider.model);
    println!("Listening on http://{}", addr);

    run_server(state, addr, shutdown_signal()).await
}

async fn run_ask(config: Config, message: &str, session: &str) -> Result<()> {
    let agent = build_agent(&config)?;

    println!("{}", style("Processing...").cyan());

    match agent.handle_chat(message, session).await {
        Ok(response) => {
            println!("\n{}", style("Response:").bold());
            println!("{}", response);
            Ok(())
        }
        Err(e) => {
            error!("Error processing message: {}", e);
            anyhow::bail!("Failed to process message: {}", e);
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

//! cartbot CLI - Conversational commerce agent.

use anyhow::{Context, Result};
use cartbot::{Agent, Config, InboundMessage};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "cartbot")]
#[command(version)]
#[command(about = "Turns chat messages into catalog and cart actions via OpenRouter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server
    Serve {
        /// Bind address (overrides [server].bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Send one message through the full pipeline and print the reply
    Ask {
        /// Sender identity used for the session
        #[arg(short, long, default_value = "cli")]
        from: String,

        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Print the decoded intent and result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set subscriber: {e}");
    }
}

fn print_example_config() {
    let example = r#"# cartbot configuration file

[openrouter]
# API key (can also use OPENROUTER_API_KEY env var)
# api_key = "${OPENROUTER_API_KEY}"
base_url = "https://openrouter.ai/api/v1"
model = "openai/gpt-3.5-turbo"
timeout_secs = 60
max_tokens = 512
temperature = 0.0
# File whose contents replace the built-in interpreter prompt
# system_prompt = "prompts/tienda.txt"

[catalog]
# Catalog/cart service
base_url = "http://localhost:3000"
timeout_secs = 30

[server]
bind = "0.0.0.0:4000"
"#;
    println!("{example}");
}

/// Load the config file, or fall back to defaults when it does not exist.
fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::from_file(path).with_context(|| format!("Failed to load config from {path:?}"))
    } else {
        warn!("Config file {:?} not found, using defaults", path);
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            print_example_config();
        }

        Commands::Validate => {
            let config = Config::from_file(&cli.config)
                .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

            config
                .resolve_api_key()
                .context("Failed to resolve API key")?;

            info!("Configuration is valid");
            info!("  Model: {}", config.openrouter.model);
            info!("  Catalog: {}", config.catalog.resolved_base_url());
            info!("  Bind: {}", config.server.bind);
        }

        Commands::Serve { bind } => {
            let config = load_or_default(&cli.config)?;
            let agent = Agent::from_config(&config).context("Failed to build agent")?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());

            cartbot::server::serve(Arc::new(agent), &bind)
                .await
                .with_context(|| format!("Server on {bind} failed"))?;
        }

        Commands::Ask { from, text, json } => {
            let config = load_or_default(&cli.config)?;
            let agent = Agent::from_config(&config).context("Failed to build agent")?;

            let reply = agent
                .handle(&InboundMessage::new(from, text.join(" ")))
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                println!("{}", reply.text);
            }
        }
    }

    Ok(())
}

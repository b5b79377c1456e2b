//! Console CLI - resolve and inspect query keys from the command line
//!
//! Runs the same router the authoring console uses, so operators can see
//! which backend a key reaches and what payload comes back.

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console_router::{ConsoleConfig, QueryKey, RequestRouter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "console-cli")]
#[command(author, version, about = "Authoring console request router CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONSOLE_CONFIG")]
    config: Option<PathBuf>,

    /// Force local mode ("prod" keys are served by the mocked backend)
    #[arg(long)]
    local: bool,

    /// Mocked endpoint prefix (repeatable, replaces the configured list)
    #[arg(long = "mocked", value_name = "PREFIX")]
    mocked: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a query key and print the payload
    Resolve(KeyArgs),

    /// Show which route a query key takes, without sending it
    Explain(KeyArgs),

    /// List the ordered route table
    Routes,
}

#[derive(Args)]
struct KeyArgs {
    /// Key tokens, e.g. `slots/slotById greet_slot`
    #[arg(required_unless_present = "json")]
    tokens: Vec<String>,

    /// Key as a JSON array, e.g. '["intents-report", 7]'
    #[arg(long, conflicts_with = "tokens")]
    json: Option<String>,
}

impl KeyArgs {
    fn to_key(&self) -> Result<QueryKey> {
        match &self.json {
            Some(json) => QueryKey::from_json(json).context("Failed to parse --json key"),
            None => Ok(QueryKey::new(self.tokens.iter().cloned().map(Into::into))),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("console_router=debug,console_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = load_config(&cli)?;
    let ctx = OutputContext::new(cli.output, cli.no_color, cli.quiet);
    let router = RequestRouter::from_config(&config).context("Failed to create router")?;

    match &cli.command {
        Commands::Resolve(args) => {
            let key = args.to_key()?;
            commands::resolve(&router, &key, &ctx).await?;
        }

        Commands::Explain(args) => {
            let key = args.to_key()?;
            commands::explain(&router, &key, &ctx)?;
        }

        Commands::Routes => {
            commands::routes(&router, &ctx)?;
        }
    }

    Ok(())
}

/// Config file, then environment, then command-line flags
fn load_config(cli: &Cli) -> Result<ConsoleConfig> {
    let mut config = match &cli.config {
        Some(path) => ConsoleConfig::load_from(path)?,
        None => ConsoleConfig::load().unwrap_or_else(|e| {
            tracing::warn!("Ignoring default config: {}", e);
            ConsoleConfig::default()
        }),
    };

    config.apply_env();

    if cli.local {
        config.local = true;
    }
    if !cli.mocked.is_empty() {
        config.mocked_endpoints = cli.mocked.clone();
    }

    tracing::debug!(
        local = config.local,
        mocked = ?config.mocked_endpoints,
        "Resolved configuration"
    );
    Ok(config)
}

//! sharesync CLI - Command-line interface for sharesync
//!
//! Provides commands for:
//! - Running and inspecting scheduled sync jobs
//! - Direct provider admin operations (listing, housekeeping, recycle bin)
//! - Scheduler inspection and cron validation
//! - Viewing and validating configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::completions::CompletionsCommand;
use commands::config::ConfigCommand;
use commands::provider::ProviderCommand;
use commands::scheduler::SchedulerCommand;
use commands::sync::SyncCommand;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "sharesync", version, about = "Scheduled share-to-disk sync for cloud drives")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run and inspect scheduled sync jobs
    #[command(subcommand)]
    Sync(SyncCommand),
    /// Direct admin access to one cloud-drive account
    #[command(subcommand)]
    Provider(ProviderCommand),
    /// Inspect the cron scheduler and validate cron expressions
    #[command(subcommand)]
    Scheduler(SchedulerCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(format).await,
        Commands::Provider(cmd) => cmd.execute(format).await,
        Commands::Scheduler(cmd) => cmd.execute(format).await,
        Commands::Config(cmd) => cmd.execute(format).await,
        Commands::Completions(cmd) => cmd.execute(format).await,
    }
}

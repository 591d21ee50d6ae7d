//! docvec CLI
//!
//! Main entry point for the docvec command-line tool.
//! Splits local documents, embeds them and upserts the vectors into an index.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ConfigCommand, IndexCommand, IngestCommand};
use docvec_core::{config::AppConfig, logging, AppError, AppResult};
use std::path::PathBuf;
use tokio::signal;

/// docvec - load documents into a vector index
#[derive(Parser, Debug)]
#[command(name = "docvec")]
#[command(about = "Chunk, embed and upsert documents into a vector index", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DOCVEC_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DOCVEC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest documents into the vector index
    Ingest(IngestCommand),

    /// Vector index management
    Index(IndexCommand),

    /// Inspect configuration
    Config(ConfigCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest(_) => "ingest",
            Commands::Index(_) => "index",
            Commands::Config(_) => "config",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration for the chosen workspace from file and environment
    let config = AppConfig::load_with(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(cli.log_level, cli.verbose, cli.no_color, cli.json_logs);

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.json_logs)?;

    tracing::info!("docvec starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Embedding provider: {}", config.embedding.provider);
    tracing::debug!("Index: {} ({:?})", config.index.name, config.index.backend);

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = tokio::select! {
        result = run_command(cli.command, &config) => result,
        _ = shutdown_signal() => {
            tracing::warn!("Received shutdown signal, stopping");
            Err(AppError::Other("Interrupted".to_string()))
        }
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

async fn run_command(command: Commands, config: &AppConfig) -> AppResult<()> {
    match command {
        Commands::Ingest(cmd) => cmd.execute(config).await,
        Commands::Index(cmd) => cmd.execute(config).await,
        Commands::Config(cmd) => cmd.execute(config),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

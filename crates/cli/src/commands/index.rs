//! Index command handler.
//!
//! Bootstraps the configured vector index without ingesting anything.

use super::{bootstrap_index, open_index, outcome_label};
use clap::{Args, Subcommand};
use docvec_core::{config::AppConfig, AppResult};

/// Vector index management
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Create the index if it does not exist and wait until it is ready
    Ensure(IndexEnsureCommand),
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Ensure(cmd) => cmd.execute(config).await,
        }
    }
}

/// Create the index if needed
#[derive(Args, Debug)]
pub struct IndexEnsureCommand {
    /// Index name (overrides config)
    #[arg(long)]
    pub name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexEnsureCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mut config = config.clone();
        if let Some(name) = &self.name {
            config.index.name = name.clone();
        }
        config.validate()?;

        tracing::info!("Executing index ensure command for '{}'", config.index.name);

        let index = open_index(&config)?;
        let outcome = bootstrap_index(&config, index.manager.as_ref()).await?;

        if self.json {
            let output = serde_json::json!({
                "index": config.index.name,
                "backend": config.index.backend,
                "dimension": config.pipeline.dimension,
                "metric": config.index.metric,
                "status": outcome_label(outcome),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Index '{}' {} (dimension {}, metric {})",
                config.index.name,
                outcome_label(outcome),
                config.pipeline.dimension,
                config.index.metric.as_str()
            );
        }

        Ok(())
    }
}

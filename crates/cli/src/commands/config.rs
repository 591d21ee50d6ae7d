//! Config command handler.

use clap::{Args, Subcommand};
use docvec_core::{config::AppConfig, AppResult};

/// Inspect configuration
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show(ConfigShowCommand),
}

impl ConfigCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            ConfigAction::Show(cmd) => cmd.execute(config),
        }
    }
}

/// Print the effective configuration
#[derive(Args, Debug)]
pub struct ConfigShowCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConfigShowCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        println!("{}", render(config, self.json)?);
        Ok(())
    }
}

/// Configuration as YAML (default) or pretty JSON.
fn render(config: &AppConfig, json: bool) -> AppResult<String> {
    if json {
        Ok(serde_json::to_string_pretty(config)?)
    } else {
        Ok(serde_yaml::to_string(config)?)
    }
}

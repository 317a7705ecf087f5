//! Configuration command
//!
//! Usage: dispatchx config show

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::DispatchConfig;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
}

pub fn execute(args: ConfigArgs, config: &DispatchConfig) -> Result<()> {
    match args.command {
        ConfigCommand::Show => print!("{}", config.to_toml()?),
    }
    Ok(())
}

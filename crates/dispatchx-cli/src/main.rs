//! DispatchX CLI
//!
//! Command-line front end for the dispatch decision engine

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use crate::config::DispatchConfig;

#[derive(Debug, Parser)]
#[command(name = "dispatchx")]
#[command(about = "DispatchX - appliance issue dispatch decisions", long_about = None)]
struct Cli {
    /// TOML config file (default: ./dispatchx.toml when present)
    #[arg(long, global = true, env = "DISPATCHX_CONFIG")]
    config: Option<PathBuf>,

    /// Database path, overriding the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    Migrate,
    /// Seed import operations
    Seed(commands::seed::SeedArgs),
    /// Dispatch one reported issue
    Dispatch(commands::dispatch::DispatchArgs),
    /// Inspect dispatch records
    Records(commands::records::RecordsArgs),
    /// Show a tenant and their assets
    Tenant(commands::inspect::TenantArgs),
    /// Dashboard counts
    Stats,
    /// Recently sent emails
    Outbox(commands::inspect::OutboxArgs),
    /// Serve tool calls as JSON lines on stdin/stdout
    Tool,
    /// Configuration operations
    Config(commands::config_show::ConfigArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = DispatchConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    dispatchx_core::logging_facility::init(config.profile()?);

    match cli.command {
        Commands::Migrate => commands::migrate::execute(&config),
        Commands::Seed(args) => commands::seed::execute(args, &config),
        Commands::Dispatch(args) => commands::dispatch::execute(args, &config).await,
        Commands::Records(args) => commands::records::execute(args, &config).await,
        Commands::Tenant(args) => commands::inspect::execute_tenant(args, &config).await,
        Commands::Stats => commands::inspect::execute_stats(&config).await,
        Commands::Outbox(args) => commands::inspect::execute_outbox(args, &config).await,
        Commands::Tool => commands::tool::execute(&config).await,
        Commands::Config(args) => commands::config_show::execute(args, &config),
    }
}

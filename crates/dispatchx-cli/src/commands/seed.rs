//! Seed import command
//!
//! Usage: dispatchx seed import <PATH> | dispatchx seed bundled

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use dispatchx_store::seed::{import_seed, import_seed_str, SeedImportReport, BUNDLED_SEED};
use std::path::{Path, PathBuf};

use super::open_store;
use crate::config::DispatchConfig;

#[derive(Debug, Args)]
pub struct SeedArgs {
    #[command(subcommand)]
    pub command: SeedCommand,
}

#[derive(Debug, Subcommand)]
pub enum SeedCommand {
    /// Import a seed file, or every .yaml/.yml file in a directory
    Import(ImportArgs),
    /// Import the demo building shipped with the binary
    Bundled,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Path to seed YAML file or directory
    pub path: PathBuf,
}

pub fn execute(args: SeedArgs, config: &DispatchConfig) -> Result<()> {
    let store = open_store(config)?;
    let mut conn = store.connect()?;

    match args.command {
        SeedCommand::Import(import) => {
            for path in seed_files(&import.path)? {
                println!("Importing {}...", path.display());
                let report = import_seed(&path, &mut conn, Utc::now())?;
                print_report(&report);
            }
        }
        SeedCommand::Bundled => {
            println!("Importing bundled demo building...");
            let report = import_seed_str(BUNDLED_SEED, "bundled", &mut conn, Utc::now())?;
            print_report(&report);
        }
    }
    Ok(())
}

/// The file itself, or a directory's seed files sorted by name
fn seed_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn print_report(report: &SeedImportReport) {
    if report.already_applied {
        println!("✓ Already applied (digest: {})", report.digest);
    } else {
        println!(
            "✓ Imported {} tenants, {} assets, {} warranties (digest: {})",
            report.tenants, report.assets, report.warranties, report.digest
        );
    }
}

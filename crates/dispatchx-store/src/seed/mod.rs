//! Seed import system
//!
//! Provides:
//! - Seed file schema (tenants with nested assets and warranties)
//! - YAML parser with validation
//! - Digest canonicalization
//! - Importer that records each applied seed once

pub mod digest;
pub mod format;
pub mod importer;
pub mod parser;

pub use digest::compute_seed_digest;
pub use format::SeedFile;
pub use importer::{import_seed, import_seed_str, SeedImportReport};
pub use parser::{parse_seed_file, parse_seed_str};

/// The demo building shipped with the binary
pub const BUNDLED_SEED: &str = include_str!("../../seeds/building.yaml");

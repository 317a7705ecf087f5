//! Seed parser with validation
//!
//! Checks the schema version, id uniqueness across the whole file, and that
//! every warranty window is non-empty.

#![allow(clippy::result_large_err)]

use crate::errors::{seed_validation, Result};
use crate::seed::format::SeedFile;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

pub fn parse_seed_file(path: &Path) -> Result<SeedFile> {
    let content = fs::read_to_string(path)
        .map_err(|e| seed_validation(&format!("Failed to read seed file: {}", e)))?;
    parse_seed_str(&content)
}

pub fn parse_seed_str(content: &str) -> Result<SeedFile> {
    let seed: SeedFile = serde_yaml::from_str(content)
        .map_err(|e| seed_validation(&format!("YAML parse error: {}", e)))?;
    validate_seed(&seed)?;
    Ok(seed)
}

fn validate_seed(seed: &SeedFile) -> Result<()> {
    if seed.schema_version != SUPPORTED_SCHEMA_VERSION {
        return Err(seed_validation(&format!(
            "Unsupported schema_version: {}. Expected {}",
            seed.schema_version, SUPPORTED_SCHEMA_VERSION
        )));
    }

    let mut tenant_ids = HashSet::new();
    let mut asset_ids = HashSet::new();
    let mut serials = HashSet::new();

    for tenant in &seed.tenants {
        if tenant.id.trim().is_empty() || tenant.name.trim().is_empty() {
            return Err(seed_validation("Tenant id and name must not be empty"));
        }
        if !tenant_ids.insert(tenant.id.as_str()) {
            return Err(seed_validation(&format!("Duplicate tenant id: {}", tenant.id)));
        }

        for asset in &tenant.assets {
            if !asset_ids.insert(asset.id.as_str()) {
                return Err(seed_validation(&format!("Duplicate asset id: {}", asset.id)));
            }
            if let Some(serial) = &asset.serial_number {
                if !serials.insert(serial.to_lowercase()) {
                    return Err(seed_validation(&format!(
                        "Duplicate serial number: {}",
                        serial
                    )));
                }
            }
            for warranty in &asset.warranties {
                if warranty.end <= warranty.start {
                    return Err(seed_validation(&format!(
                        "Warranty for asset {} ends on or before it starts",
                        asset.id
                    )));
                }
            }
        }
    }

    Ok(())
}

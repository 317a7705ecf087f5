//! Seed digest canonicalization
//!
//! The digest ignores formatting and list order so that a reformatted seed
//! is recognised as already applied.

use crate::errors::Result;
use crate::seed::format::{SeedAsset, SeedFile, SeedTenant, SeedWarranty};
use sha2::{Digest, Sha256};

/// SHA256 hex digest of the canonicalized seed
pub fn compute_seed_digest(seed: &SeedFile) -> Result<String> {
    let canonical = canonicalize(seed);
    let json = serde_json::to_string(&canonical)?;
    Ok(hex::encode(Sha256::digest(json.as_bytes())))
}

fn canonicalize(seed: &SeedFile) -> SeedFile {
    let mut tenants: Vec<SeedTenant> = seed
        .tenants
        .iter()
        .map(|tenant| {
            let mut assets: Vec<SeedAsset> = tenant
                .assets
                .iter()
                .map(|asset| {
                    let mut warranties: Vec<SeedWarranty> = asset.warranties.clone();
                    warranties.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
                    SeedAsset {
                        warranties,
                        ..asset.clone()
                    }
                })
                .collect();
            assets.sort_by(|a, b| a.id.cmp(&b.id));
            SeedTenant {
                assets,
                ..tenant.clone()
            }
        })
        .collect();
    tenants.sort_by(|a, b| a.id.cmp(&b.id));

    SeedFile {
        schema_version: seed.schema_version,
        building: None,
        tenants,
    }
}

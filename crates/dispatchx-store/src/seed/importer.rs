//! Seed importer orchestration
//!
//! Imports run in one IMMEDIATE transaction. A seed whose digest is already
//! recorded in `seed_imports` is skipped, so importing twice is harmless.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::repo::{to_millis, ContextRepo};
use crate::seed::format::{SeedAsset, SeedFile};
use crate::seed::{compute_seed_digest, parse_seed_file, parse_seed_str};
use chrono::{DateTime, NaiveDate, Utc};
use dispatchx_core::model::{Asset, Tenant, WarrantyRecord};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedImportReport {
    pub digest: String,
    pub tenants: usize,
    pub assets: usize,
    pub warranties: usize,
    /// True when this exact seed had been imported before and nothing was written
    pub already_applied: bool,
}

pub fn import_seed(path: &Path, conn: &mut Connection, now: DateTime<Utc>) -> Result<SeedImportReport> {
    let seed = parse_seed_file(path)?;
    apply_seed(&seed, &path.display().to_string(), conn, now)
}

pub fn import_seed_str(
    content: &str,
    source: &str,
    conn: &mut Connection,
    now: DateTime<Utc>,
) -> Result<SeedImportReport> {
    let seed = parse_seed_str(content)?;
    apply_seed(&seed, source, conn, now)
}

fn apply_seed(
    seed: &SeedFile,
    source: &str,
    conn: &mut Connection,
    now: DateTime<Utc>,
) -> Result<SeedImportReport> {
    let digest = compute_seed_digest(seed)?;
    let mut report = SeedImportReport {
        digest: digest.clone(),
        tenants: 0,
        assets: 0,
        warranties: 0,
        already_applied: false,
    };

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;

    let seen: Option<i64> = tx
        .query_row("SELECT 1 FROM seed_imports WHERE digest = ?1", [&digest], |row| row.get(0))
        .optional()
        .map_err(from_rusqlite)?;
    if seen.is_some() {
        tracing::debug!(digest = %digest, "Seed already applied");
        report.already_applied = true;
        return Ok(report);
    }

    for seed_tenant in &seed.tenants {
        let tenant = Tenant::new(
            seed_tenant.id.clone(),
            seed_tenant.name.clone(),
            seed_tenant.unit.clone(),
            seed_tenant.contact_email.clone(),
        );
        ContextRepo::upsert_tenant(&tx, &tenant, now)?;
        report.tenants += 1;

        for seed_asset in &seed_tenant.assets {
            ContextRepo::upsert_asset(&tx, &asset_from_seed(&tenant.id, seed_asset), now)?;
            report.assets += 1;

            for warranty in warranties_from_seed(seed_asset) {
                ContextRepo::upsert_warranty(&tx, &warranty, now)?;
                report.warranties += 1;
            }
        }
    }

    tx.execute(
        "INSERT INTO seed_imports (digest, source, tenants, assets, warranties, imported_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            digest,
            source,
            report.tenants as i64,
            report.assets as i64,
            report.warranties as i64,
            to_millis(now),
        ],
    )
    .map_err(from_rusqlite)?;

    tx.commit().map_err(from_rusqlite)?;

    tracing::debug!(
        digest = %report.digest,
        tenants = report.tenants,
        assets = report.assets,
        "Seed imported"
    );
    Ok(report)
}

fn asset_from_seed(tenant_id: &str, seed: &SeedAsset) -> Asset {
    Asset {
        id: seed.id.clone(),
        tenant_id: tenant_id.to_string(),
        category: seed.category.clone(),
        manufacturer: seed.manufacturer.clone(),
        model: seed.model.clone(),
        serial_number: seed.serial_number.clone(),
        installed_on: seed.installed_on,
        support_contact: seed.support_contact.clone(),
    }
}

fn warranties_from_seed(seed: &SeedAsset) -> Vec<WarrantyRecord> {
    seed.warranties
        .iter()
        .enumerate()
        .map(|(position, w)| WarrantyRecord {
            id: w
                .id
                .clone()
                .unwrap_or_else(|| format!("{}:w{}", seed.id, position + 1)),
            asset_id: seed.id.clone(),
            coverage_start: start_of_day(w.start),
            coverage_end: start_of_day(w.end),
        })
        .collect()
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

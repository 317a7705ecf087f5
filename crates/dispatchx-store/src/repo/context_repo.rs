//! Tenants, assets and warranty records
//!
//! Tenant lookups compare case-insensitively. Upserts are the
//! administrative edit path; nothing in the dispatch flow writes here.

#![allow(clippy::result_large_err)]

use crate::errors::{corrupt_column, from_rusqlite, Result};
use crate::repo::{from_millis, to_millis};
use chrono::{DateTime, NaiveDate, Utc};
use dispatchx_core::errors::{ExError, ExErrorKind};
use dispatchx_core::model::{Asset, Tenant, WarrantyRecord};
use rusqlite::{Connection, OptionalExtension, Row};

const TENANT_COLUMNS: &str = "id, name, unit, contact_email";
const ASSET_COLUMNS: &str =
    "id, tenant_id, category, manufacturer, model, serial_number, installed_on, support_contact";
const WARRANTY_COLUMNS: &str = "id, asset_id, coverage_start, coverage_end";

pub struct ContextRepo;

impl ContextRepo {
    pub fn upsert_tenant(conn: &Connection, tenant: &Tenant, now: DateTime<Utc>) -> Result<()> {
        conn.execute(
            "INSERT INTO tenants (id, name, unit, contact_email, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                unit = excluded.unit,
                contact_email = excluded.contact_email,
                updated_at = excluded.updated_at",
            rusqlite::params![
                tenant.id,
                tenant.name,
                tenant.unit,
                tenant.contact_email,
                to_millis(now),
            ],
        )
        .map_err(from_rusqlite)?;

        Ok(())
    }

    pub fn upsert_asset(conn: &Connection, asset: &Asset, now: DateTime<Utc>) -> Result<()> {
        conn.execute(
            "INSERT INTO assets (id, tenant_id, category, manufacturer, model, serial_number,
                                 installed_on, support_contact, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT(id) DO UPDATE SET
                tenant_id = excluded.tenant_id,
                category = excluded.category,
                manufacturer = excluded.manufacturer,
                model = excluded.model,
                serial_number = excluded.serial_number,
                installed_on = excluded.installed_on,
                support_contact = excluded.support_contact,
                updated_at = excluded.updated_at",
            rusqlite::params![
                asset.id,
                asset.tenant_id,
                asset.category,
                asset.manufacturer,
                asset.model,
                asset.serial_number,
                asset.installed_on.format("%Y-%m-%d").to_string(),
                asset.support_contact,
                to_millis(now),
            ],
        )
        .map_err(from_rusqlite)?;

        Ok(())
    }

    /// Insert a warranty record, or replace its coverage if the id exists
    pub fn upsert_warranty(
        conn: &Connection,
        warranty: &WarrantyRecord,
        now: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO warranty_records (id, asset_id, coverage_start, coverage_end,
                                           created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(id) DO UPDATE SET
                coverage_start = excluded.coverage_start,
                coverage_end = excluded.coverage_end,
                updated_at = excluded.updated_at",
            rusqlite::params![
                warranty.id,
                warranty.asset_id,
                to_millis(warranty.coverage_start),
                to_millis(warranty.coverage_end),
                to_millis(now),
            ],
        )
        .map_err(from_rusqlite)?;

        Ok(())
    }

    /// Administrative correction of an existing warranty's coverage window
    ///
    /// # Errors
    ///
    /// - `NotFound` if no warranty record has this id
    /// - `InvalidInput` if the window is empty or inverted
    pub fn correct_warranty(
        conn: &Connection,
        warranty_id: &str,
        coverage_start: DateTime<Utc>,
        coverage_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if coverage_end <= coverage_start {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("correct_warranty")
                .with_entity_id(warranty_id)
                .with_message("coverage_end must be after coverage_start"));
        }

        let changed = conn
            .execute(
                "UPDATE warranty_records
                 SET coverage_start = ?2, coverage_end = ?3, updated_at = ?4
                 WHERE id = ?1",
                rusqlite::params![
                    warranty_id,
                    to_millis(coverage_start),
                    to_millis(coverage_end),
                    to_millis(now),
                ],
            )
            .map_err(from_rusqlite)?;

        if changed == 0 {
            return Err(ExError::new(ExErrorKind::NotFound)
                .with_op("correct_warranty")
                .with_entity_id(warranty_id)
                .with_message("warranty record not found"));
        }
        Ok(())
    }

    pub fn get_tenant(conn: &Connection, tenant_id: &str) -> Result<Option<Tenant>> {
        conn.query_row(
            &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = ?1"),
            [tenant_id],
            tenant_from_row,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// Tenants whose name or unit equals the hint, ignoring case
    pub fn find_tenants_by_name_or_unit(conn: &Connection, hint: &str) -> Result<Vec<Tenant>> {
        query_tenants(
            conn,
            &format!(
                "SELECT {TENANT_COLUMNS} FROM tenants
                 WHERE name = ?1 COLLATE NOCASE OR unit = ?1 COLLATE NOCASE
                 ORDER BY id"
            ),
            hint,
        )
    }

    /// Tenants whose name contains the hint, ignoring case
    pub fn find_tenants_name_containing(conn: &Connection, hint: &str) -> Result<Vec<Tenant>> {
        query_tenants(
            conn,
            &format!(
                "SELECT {TENANT_COLUMNS} FROM tenants
                 WHERE instr(lower(name), lower(?1)) > 0
                 ORDER BY id"
            ),
            hint,
        )
    }

    pub fn list_tenants(conn: &Connection) -> Result<Vec<Tenant>> {
        let mut stmt = conn
            .prepare(&format!("SELECT {TENANT_COLUMNS} FROM tenants ORDER BY id"))
            .map_err(from_rusqlite)?;
        let tenants = stmt
            .query_map([], tenant_from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(tenants)
    }

    pub fn get_asset(conn: &Connection, asset_id: &str) -> Result<Option<Asset>> {
        let row = conn
            .query_row(
                &format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = ?1"),
                [asset_id],
                AssetRow::from_row,
            )
            .optional()
            .map_err(from_rusqlite)?;
        row.map(AssetRow::into_asset).transpose()
    }

    pub fn list_assets_for_tenant(conn: &Connection, tenant_id: &str) -> Result<Vec<Asset>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ASSET_COLUMNS} FROM assets WHERE tenant_id = ?1 ORDER BY id"
            ))
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([tenant_id], AssetRow::from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter().map(AssetRow::into_asset).collect()
    }

    pub fn list_warranties_for_asset(
        conn: &Connection,
        asset_id: &str,
    ) -> Result<Vec<WarrantyRecord>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {WARRANTY_COLUMNS} FROM warranty_records
                 WHERE asset_id = ?1 ORDER BY coverage_start, id"
            ))
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([asset_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        rows.into_iter()
            .map(|(id, asset_id, start, end)| {
                Ok(WarrantyRecord {
                    id,
                    asset_id,
                    coverage_start: from_millis("coverage_start", start)?,
                    coverage_end: from_millis("coverage_end", end)?,
                })
            })
            .collect()
    }

    pub fn count_tenants(conn: &Connection) -> Result<u64> {
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tenants", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        Ok(count as u64)
    }

    /// Number of assets with at least one warranty covering `now`
    pub fn count_assets_under_warranty(conn: &Connection, now: DateTime<Utc>) -> Result<u64> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(DISTINCT asset_id) FROM warranty_records
                 WHERE coverage_start <= ?1 AND ?1 < coverage_end",
                [to_millis(now)],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        Ok(count as u64)
    }
}

fn query_tenants(conn: &Connection, sql: &str, hint: &str) -> Result<Vec<Tenant>> {
    let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
    let tenants = stmt
        .query_map([hint], tenant_from_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(tenants)
}

fn tenant_from_row(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        unit: row.get(2)?,
        contact_email: row.get(3)?,
    })
}

struct AssetRow {
    id: String,
    tenant_id: String,
    category: String,
    manufacturer: String,
    model: String,
    serial_number: Option<String>,
    installed_on: String,
    support_contact: String,
}

impl AssetRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            category: row.get(2)?,
            manufacturer: row.get(3)?,
            model: row.get(4)?,
            serial_number: row.get(5)?,
            installed_on: row.get(6)?,
            support_contact: row.get(7)?,
        })
    }

    fn into_asset(self) -> Result<Asset> {
        let installed_on = NaiveDate::parse_from_str(&self.installed_on, "%Y-%m-%d")
            .map_err(|_| corrupt_column("installed_on", &self.installed_on))?;
        Ok(Asset {
            id: self.id,
            tenant_id: self.tenant_id,
            category: self.category,
            manufacturer: self.manufacturer,
            model: self.model,
            serial_number: self.serial_number,
            installed_on,
            support_contact: self.support_contact,
        })
    }
}

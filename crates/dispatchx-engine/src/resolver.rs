//! Context Resolver
//!
//! Turns a tenant hint and an asset hint into a consistent, point-in-time
//! view of tenant, asset and warranty state. All reads for one resolution run
//! inside a single read transaction. Warranty status is computed against the
//! `now` passed in and never cached.
//!
//! Lookup order for tenants: exact id, then exact name or unit (ignoring
//! case), then name substring. Assets are searched only among the resolved
//! tenant's assets: exact id or serial first, then description.
//!
//! Functions return `Result<_, ExError>` for store failures and carry domain
//! outcomes (ambiguity, not owned, not found) inside the `Ok` value.

#![allow(clippy::result_large_err)]

use chrono::{DateTime, Utc};
use dispatchx_core::errors::DispatchError;
use dispatchx_core::model::{warranty_status_at, Asset, Tenant, WarrantyRecord, WarrantyStatus};
use dispatchx_store::errors::{from_rusqlite, Result};
use dispatchx_store::repo::ContextRepo;
use rusqlite::Connection;
use serde::Serialize;

/// Snapshot of the context a dispatch decision is made against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedContext {
    pub tenant: Tenant,
    pub asset: Asset,
    pub warranties: Vec<WarrantyRecord>,
    pub warranty_status: WarrantyStatus,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedContext),
    /// Resolution failed; `tenant_id` is set when only the asset failed
    Unresolved {
        tenant_id: Option<String>,
        error: DispatchError,
    },
}

pub fn resolve(
    conn: &mut Connection,
    tenant_hint: &str,
    asset_hint: &str,
    now: DateTime<Utc>,
) -> Result<Resolution> {
    let tx = conn.transaction().map_err(from_rusqlite)?;

    let tenant = match lookup_tenant(&tx, tenant_hint)? {
        Ok(tenant) => tenant,
        Err(error) => {
            return Ok(Resolution::Unresolved {
                tenant_id: None,
                error,
            })
        }
    };

    let asset = match lookup_asset(&tx, &tenant, asset_hint)? {
        Ok(asset) => asset,
        Err(error) => {
            return Ok(Resolution::Unresolved {
                tenant_id: Some(tenant.id),
                error,
            })
        }
    };

    let warranties = ContextRepo::list_warranties_for_asset(&tx, &asset.id)?;
    tx.commit().map_err(from_rusqlite)?;

    let warranty_status = warranty_status_at(&warranties, now);
    tracing::debug!(
        tenant_id = %tenant.id,
        asset_id = %asset.id,
        warranty_status = %warranty_status,
        "Context resolved"
    );

    Ok(Resolution::Resolved(ResolvedContext {
        tenant,
        asset,
        warranties,
        warranty_status,
        resolved_at: now,
    }))
}

/// Find exactly one tenant for `hint`
pub fn lookup_tenant(
    conn: &Connection,
    hint: &str,
) -> Result<std::result::Result<Tenant, DispatchError>> {
    let hint = hint.trim();
    if hint.is_empty() {
        return Ok(Err(DispatchError::TenantNotFound {
            hint: String::new(),
        }));
    }

    if let Some(tenant) = ContextRepo::get_tenant(conn, hint)? {
        return Ok(Ok(tenant));
    }

    let exact = ContextRepo::find_tenants_by_name_or_unit(conn, hint)?;
    if !exact.is_empty() {
        return Ok(single_tenant(hint, exact));
    }

    let partial = ContextRepo::find_tenants_name_containing(conn, hint)?;
    if partial.is_empty() {
        return Ok(Err(DispatchError::TenantNotFound {
            hint: hint.to_string(),
        }));
    }
    Ok(single_tenant(hint, partial))
}

/// Find exactly one of `tenant`'s assets for `hint`
pub fn lookup_asset(
    conn: &Connection,
    tenant: &Tenant,
    hint: &str,
) -> Result<std::result::Result<Asset, DispatchError>> {
    let assets = ContextRepo::list_assets_for_tenant(conn, &tenant.id)?;

    if let Some(asset) = assets.iter().find(|a| a.matches_identifier(hint)) {
        return Ok(Ok(asset.clone()));
    }

    let mut described: Vec<Asset> = assets
        .into_iter()
        .filter(|a| a.matches_description(hint))
        .collect();

    // "bosch dishwasher" should pick the Bosch one when two dishwashers match
    if described.len() > 1 {
        let branded: Vec<Asset> = described
            .iter()
            .filter(|a| a.names_brand(hint))
            .cloned()
            .collect();
        if !branded.is_empty() {
            described = branded;
        }
    }

    Ok(match described.len() {
        0 => Err(DispatchError::AssetNotOwned {
            tenant_id: tenant.id.clone(),
            asset_hint: hint.trim().to_string(),
        }),
        1 => Ok(described.remove(0)),
        _ => Err(DispatchError::AmbiguousAsset {
            tenant_id: tenant.id.clone(),
            asset_hint: hint.trim().to_string(),
            candidates: described.into_iter().map(|a| a.id).collect(),
        }),
    })
}

fn single_tenant(hint: &str, mut matches: Vec<Tenant>) -> std::result::Result<Tenant, DispatchError> {
    if matches.len() == 1 {
        return Ok(matches.remove(0));
    }
    Err(DispatchError::AmbiguousTenant {
        hint: hint.to_string(),
        candidates: matches.into_iter().map(|t| t.id).collect(),
    })
}

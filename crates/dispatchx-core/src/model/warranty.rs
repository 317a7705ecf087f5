use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DispatchError;

/// Coverage period for an asset
///
/// Never mutated after creation except by administrative correction. Status
/// is not stored; it is derived from the coverage bounds on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyRecord {
    pub id: String,
    pub asset_id: String,
    pub coverage_start: DateTime<Utc>,
    pub coverage_end: DateTime<Utc>,
}

impl WarrantyRecord {
    /// Coverage is half-open: `coverage_start <= now < coverage_end`.
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        self.coverage_start <= now && now < self.coverage_end
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> WarrantyStatus {
        if self.covers(now) {
            WarrantyStatus::Active
        } else {
            WarrantyStatus::Expired
        }
    }
}

/// Warranty status derived at query time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarrantyStatus {
    Active,
    Expired,
}

impl WarrantyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarrantyStatus::Active => "active",
            WarrantyStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for WarrantyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WarrantyStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(WarrantyStatus::Active),
            "expired" => Ok(WarrantyStatus::Expired),
            other => Err(DispatchError::UnknownVariant {
                field: "warranty_status".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Status across all coverage periods of one asset
///
/// Active iff any period covers `now`; an asset without periods is expired.
pub fn warranty_status_at(records: &[WarrantyRecord], now: DateTime<Utc>) -> WarrantyStatus {
    if records.iter().any(|r| r.covers(now)) {
        WarrantyStatus::Active
    } else {
        WarrantyStatus::Expired
    }
}

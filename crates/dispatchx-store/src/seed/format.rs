//! Seed file schema
//!
//! Warranty dates are calendar days; coverage runs from the start of `start`
//! to the start of `end` in UTC.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    /// Must be 1 for this format
    pub schema_version: u32,

    /// Free-form label recorded with the import
    #[serde(default)]
    pub building: Option<String>,

    pub tenants: Vec<SeedTenant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedTenant {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub contact_email: String,
    #[serde(default)]
    pub assets: Vec<SeedAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedAsset {
    pub id: String,
    pub category: String,
    pub manufacturer: String,
    pub model: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    pub installed_on: NaiveDate,
    pub support_contact: String,
    #[serde(default)]
    pub warranties: Vec<SeedWarranty>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedWarranty {
    /// Defaults to `<asset id>:w<position>`
    #[serde(default)]
    pub id: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

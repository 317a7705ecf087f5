use serde::{Deserialize, Serialize};

/// A resident of the building
///
/// Immutable except through administrative edits; dispatch records refer to
/// tenants by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    /// Unit or location label, e.g. "205"
    pub unit: String,
    pub contact_email: String,
}

impl Tenant {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        contact_email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit: unit.into(),
            contact_email: contact_email.into(),
        }
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An appliance or fixture installed in a tenant's unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    /// Back-reference to the owning tenant
    pub tenant_id: String,
    /// Appliance type, e.g. "dishwasher"
    pub category: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: Option<String>,
    pub installed_on: NaiveDate,
    /// Manufacturer support contact used for warranty claims
    pub support_contact: String,
}

impl Asset {
    /// Human label used in emails and tool responses: "Bosch SMS46 dishwasher"
    pub fn describe(&self) -> String {
        format!("{} {} {}", self.manufacturer, self.model, self.category)
    }

    /// Whole-word match of a spoken description
    ///
    /// Matches when the hint contains every word of the category, names the
    /// model, or consists only of category, manufacturer and model words.
    /// "washer" does not match a dishwasher.
    pub fn matches_description(&self, hint: &str) -> bool {
        let spoken = words(hint);
        if spoken.is_empty() {
            return false;
        }
        let category = words(&self.category);
        let model = self.model.to_lowercase();

        if !category.is_empty() && category.iter().all(|w| spoken.contains(w)) {
            return true;
        }
        if spoken.contains(&model) {
            return true;
        }
        let manufacturer = words(&self.manufacturer);
        spoken
            .iter()
            .all(|w| category.contains(w) || manufacturer.contains(w) || *w == model)
    }

    /// The hint names this asset's manufacturer or model as a word
    pub fn names_brand(&self, hint: &str) -> bool {
        let spoken = words(hint);
        let manufacturer = words(&self.manufacturer);
        (!manufacturer.is_empty() && manufacturer.iter().all(|w| spoken.contains(w)))
            || spoken.contains(&self.model.to_lowercase())
    }

    /// Exact match on asset id or serial number
    pub fn matches_identifier(&self, hint: &str) -> bool {
        let hint = hint.trim();
        self.id == hint
            || self
                .serial_number
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(hint))
    }
}

/// Lowercase words; hyphens stay inside a word so "dw-900" is one token
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dishwasher() -> Asset {
        Asset {
            id: "dishwasher-42".to_string(),
            tenant_id: "T1".to_string(),
            category: "dishwasher".to_string(),
            manufacturer: "Acme".to_string(),
            model: "DW-900".to_string(),
            serial_number: Some("SN-DW-42".to_string()),
            installed_on: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            support_contact: "support@acme.example".to_string(),
        }
    }

    #[test]
    fn test_matches_identifier_by_id_and_serial() {
        let asset = dishwasher();
        assert!(asset.matches_identifier("dishwasher-42"));
        assert!(asset.matches_identifier("sn-dw-42"));
        assert!(!asset.matches_identifier("dishwasher"));
    }

    #[test]
    fn test_matches_description_variants() {
        let asset = dishwasher();
        assert!(asset.matches_description("Dishwasher"));
        assert!(asset.matches_description("the dishwasher is leaking"));
        assert!(asset.matches_description("acme dishwasher"));
        assert!(asset.matches_description("dw-900"));
        assert!(!asset.matches_description("fridge"));
        assert!(!asset.matches_description("   "));
    }

    #[test]
    fn test_matches_description_needs_whole_words() {
        let asset = dishwasher();
        assert!(!asset.matches_description("washer"));
        assert!(!asset.matches_description("dish"));
        assert!(!asset.matches_description("acme washer"));
        assert!(asset.matches_description("Acme"));
    }

    #[test]
    fn test_multi_word_category() {
        let asset = Asset {
            category: "washing machine".to_string(),
            ..dishwasher()
        };
        assert!(asset.matches_description("my washing machine won't spin"));
        assert!(!asset.matches_description("washer"));
    }

    #[test]
    fn test_names_brand() {
        let asset = dishwasher();
        assert!(asset.names_brand("the acme dishwasher"));
        assert!(asset.names_brand("DW-900"));
        assert!(!asset.names_brand("acmes"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(dishwasher().describe(), "Acme DW-900 dishwasher");
    }
}

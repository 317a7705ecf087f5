//! Idempotency key derivation
//!
//! A key identifies one logical dispatch: the same tenant, asset and issue
//! window always derive the same key, which the store enforces as unique.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::errors::DispatchError;

const SEPARATOR: &str = "\u{1f}";
const UNRESOLVED_PREFIX: &str = "unresolved:";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Key for a request whose context resolved to concrete ids
    pub fn derive(tenant_id: &str, asset_id: &str, window: NaiveDate) -> Self {
        Self(digest(&[tenant_id, asset_id, &window.to_string()]))
    }

    /// Key for a request whose context did not resolve
    ///
    /// Hints are trimmed and lowercased so that trivially different phrasings
    /// of the same failed request collapse to one record.
    pub fn derive_unresolved(tenant_hint: &str, asset_hint: &str, window: NaiveDate) -> Self {
        let tenant = normalise(tenant_hint);
        let asset = normalise(asset_hint);
        Self(format!(
            "{}{}",
            UNRESOLVED_PREFIX,
            digest(&[&tenant, &asset, &window.to_string()])
        ))
    }

    /// Caller-supplied key
    pub fn from_caller(key: &str) -> Result<Self, DispatchError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(DispatchError::InvalidInput {
                reason: "idempotency key must not be empty".to_string(),
            });
        }
        Ok(Self(key.to_string()))
    }

    /// Fresh key for a request that supersedes `prior_record_id`
    pub fn superseding(&self, prior_record_id: &str) -> Self {
        Self(digest(&[&self.0, "supersedes", prior_record_id]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unresolved(&self) -> bool {
        self.0.starts_with(UNRESOLVED_PREFIX)
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalise(hint: &str) -> String {
    hint.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parts.join(SEPARATOR).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = IdempotencyKey::derive("T1", "fridge-7", day(9));
        let b = IdempotencyKey::derive("T1", "fridge-7", day(9));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_window_and_asset_change_the_key() {
        let base = IdempotencyKey::derive("T1", "fridge-7", day(9));
        assert_ne!(base, IdempotencyKey::derive("T1", "fridge-7", day(10)));
        assert_ne!(base, IdempotencyKey::derive("T1", "dishwasher-42", day(9)));
    }

    #[test]
    fn test_separator_prevents_concatenation_collisions() {
        let a = IdempotencyKey::derive("T1a", "b", day(9));
        let b = IdempotencyKey::derive("T1", "ab", day(9));
        assert_ne!(a, b);
    }

    #[test]
    fn test_unresolved_normalises_hints() {
        let a = IdempotencyKey::derive_unresolved("  T1 ", "Broken   Oven", day(9));
        let b = IdempotencyKey::derive_unresolved("t1", "broken oven", day(9));
        assert_eq!(a, b);
        assert!(a.is_unresolved());
    }

    #[test]
    fn test_superseding_differs_per_prior_record() {
        let base = IdempotencyKey::derive("T1", "fridge-7", day(9));
        let r1 = base.superseding("rec-1");
        let r2 = base.superseding("rec-2");
        assert_ne!(base, r1);
        assert_ne!(r1, r2);
    }

    #[test]
    fn test_caller_key_rejects_blank() {
        assert!(IdempotencyKey::from_caller("   ").is_err());
        assert_eq!(
            IdempotencyKey::from_caller(" call-7 ").unwrap().as_str(),
            "call-7"
        );
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DispatchError;
use crate::lifecycle::DispatchState;
use crate::model::warranty::WarrantyStatus;

/// Dispatch channel chosen by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Manufacturer,
    Internal,
    Failed,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Manufacturer => "manufacturer",
            Route::Internal => "internal",
            Route::Failed => "failed",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Route {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manufacturer" => Ok(Route::Manufacturer),
            "internal" => Ok(Route::Internal),
            "failed" => Ok(Route::Failed),
            other => Err(DispatchError::UnknownVariant {
                field: "route".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Execution outcome of a dispatch record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Sent,
    Booked,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Sent => "sent",
            Outcome::Booked => "booked",
            Outcome::Error => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Outcome::Pending),
            "sent" => Ok(Outcome::Sent),
            "booked" => Ok(Outcome::Booked),
            "error" => Ok(Outcome::Error),
            other => Err(DispatchError::UnknownVariant {
                field: "outcome".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Durable, append-only audit entry for one request
///
/// Once `state` is terminal the row is never updated again; corrections are
/// new records with `supersedes` pointing at the prior one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub id: String,
    pub idempotency_key: String,
    pub tenant_hint: String,
    pub asset_hint: String,
    pub tenant_id: Option<String>,
    pub asset_id: Option<String>,
    pub issue_description: String,
    /// Warranty status captured at decision time
    pub warranty_status: Option<WarrantyStatus>,
    pub route: Option<Route>,
    pub outcome: Outcome,
    pub state: DispatchState,
    /// Stable `ERR_*` code when the request failed
    pub failure_code: Option<String>,
    pub failure_detail: Option<String>,
    /// Email message id or booking id, whichever identifies the side effect
    pub external_ref: Option<String>,
    pub booking_id: Option<String>,
    pub message_id: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub supersedes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl DispatchRecord {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_and_outcome_parse_their_own_labels() {
        for route in [Route::Manufacturer, Route::Internal, Route::Failed] {
            assert_eq!(route.as_str().parse::<Route>(), Ok(route));
        }
        for outcome in [Outcome::Pending, Outcome::Sent, Outcome::Booked, Outcome::Error] {
            assert_eq!(outcome.as_str().parse::<Outcome>(), Ok(outcome));
        }
        assert!("email".parse::<Route>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_labels() {
        assert_eq!(serde_json::to_string(&Route::Internal).unwrap(), "\"internal\"");
        assert_eq!(serde_json::to_string(&Outcome::Booked).unwrap(), "\"booked\"");
    }
}

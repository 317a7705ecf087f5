//! Dispatch router
//!
//! Pure decision table from (warranty status, availability) to a route.
//! Warranty alone gates manufacturer vs internal; availability only affects
//! when an internal dispatch happens. Missing inputs always produce `Fail`,
//! never a default channel.

use serde::{Deserialize, Serialize};

use crate::errors::DispatchError;
use crate::model::{CalendarSlot, Route, WarrantyStatus};

/// Result of asking the calendar for an internal-maintenance slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Slot(CalendarSlot),
    NoSlotAvailable,
    /// API error or timeout
    CalendarUnavailable { reason: String },
    /// Availability was not queried (active warranty)
    NotChecked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InternalPlan {
    Scheduled(CalendarSlot),
    /// No free slot yet; caller retries availability later
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailReason {
    ContextUnresolved,
    RouterBlocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteDecision {
    ManufacturerDispatch,
    InternalDispatch(InternalPlan),
    Fail(FailReason),
}

impl RouteDecision {
    pub fn route(&self) -> Route {
        match self {
            RouteDecision::ManufacturerDispatch => Route::Manufacturer,
            RouteDecision::InternalDispatch(_) => Route::Internal,
            RouteDecision::Fail(_) => Route::Failed,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RouteDecision::Fail(_))
    }

    /// Error form of a failing decision, with the reason the router saw
    pub fn failure(&self, availability: &Availability) -> Option<DispatchError> {
        match self {
            RouteDecision::Fail(FailReason::ContextUnresolved) => {
                Some(DispatchError::ContextUnresolved {
                    reason: "no resolved tenant/asset context".to_string(),
                })
            }
            RouteDecision::Fail(FailReason::RouterBlocked) => {
                let reason = match availability {
                    Availability::CalendarUnavailable { reason } => {
                        format!("calendar unavailable: {}", reason)
                    }
                    _ => "availability unknown for expired warranty".to_string(),
                };
                Some(DispatchError::RouterBlocked { reason })
            }
            _ => None,
        }
    }
}

/// Decide the route for a request
///
/// `warranty` is `None` when the context did not resolve.
pub fn decide(warranty: Option<WarrantyStatus>, availability: &Availability) -> RouteDecision {
    match (warranty, availability) {
        (None, _) => RouteDecision::Fail(FailReason::ContextUnresolved),
        (Some(WarrantyStatus::Active), _) => RouteDecision::ManufacturerDispatch,
        (Some(WarrantyStatus::Expired), Availability::Slot(slot)) => {
            RouteDecision::InternalDispatch(InternalPlan::Scheduled(slot.clone()))
        }
        (Some(WarrantyStatus::Expired), Availability::NoSlotAvailable) => {
            RouteDecision::InternalDispatch(InternalPlan::Deferred)
        }
        (Some(WarrantyStatus::Expired), Availability::CalendarUnavailable { .. })
        | (Some(WarrantyStatus::Expired), Availability::NotChecked) => {
            RouteDecision::Fail(FailReason::RouterBlocked)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn slot() -> CalendarSlot {
        CalendarSlot::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap(),
            Duration::hours(2),
        )
    }

    fn availabilities() -> Vec<Availability> {
        vec![
            Availability::Slot(slot()),
            Availability::NoSlotAvailable,
            Availability::CalendarUnavailable {
                reason: "timeout".to_string(),
            },
            Availability::NotChecked,
        ]
    }

    #[test]
    fn test_active_ignores_availability() {
        for a in availabilities() {
            assert_eq!(
                decide(Some(WarrantyStatus::Active), &a),
                RouteDecision::ManufacturerDispatch
            );
        }
    }

    #[test]
    fn test_expired_with_slot_schedules_internal() {
        assert_eq!(
            decide(Some(WarrantyStatus::Expired), &Availability::Slot(slot())),
            RouteDecision::InternalDispatch(InternalPlan::Scheduled(slot()))
        );
    }

    #[test]
    fn test_expired_without_slot_defers() {
        let d = decide(Some(WarrantyStatus::Expired), &Availability::NoSlotAvailable);
        assert_eq!(d, RouteDecision::InternalDispatch(InternalPlan::Deferred));
        assert!(!d.is_failure());
        assert_eq!(d.route(), Route::Internal);
    }

    #[test]
    fn test_expired_with_calendar_down_blocks() {
        let a = Availability::CalendarUnavailable {
            reason: "503".to_string(),
        };
        let d = decide(Some(WarrantyStatus::Expired), &a);
        assert_eq!(d, RouteDecision::Fail(FailReason::RouterBlocked));
        assert!(matches!(
            d.failure(&a),
            Some(DispatchError::RouterBlocked { reason }) if reason.contains("503")
        ));
    }

    #[test]
    fn test_expired_unchecked_never_defaults_to_manufacturer() {
        assert_eq!(
            decide(Some(WarrantyStatus::Expired), &Availability::NotChecked),
            RouteDecision::Fail(FailReason::RouterBlocked)
        );
    }

    #[test]
    fn test_unresolved_context_fails() {
        for a in availabilities() {
            let d = decide(None, &a);
            assert_eq!(d, RouteDecision::Fail(FailReason::ContextUnresolved));
            assert_eq!(d.route(), Route::Failed);
        }
    }

    proptest! {
        #[test]
        fn prop_manufacturer_only_when_active(active in any::<bool>(), pick in 0usize..4) {
            let status = if active { WarrantyStatus::Active } else { WarrantyStatus::Expired };
            let a = availabilities().swap_remove(pick);
            let d = decide(Some(status), &a);
            prop_assert_eq!(d == RouteDecision::ManufacturerDispatch, active);
        }
    }
}

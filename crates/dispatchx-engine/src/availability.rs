//! Availability Checker
//!
//! Asks the calendar collaborator for the next open internal-maintenance slot.
//! Calendar errors and timeouts become `CalendarUnavailable`; an empty
//! calendar becomes `NoSlotAvailable`. Nothing is booked here.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use dispatchx_core::model::TimeWindow;
use dispatchx_core::router::Availability;
use std::sync::Arc;

use crate::collaborators::{CalendarService, SlotRequest};
use crate::settings::{with_timeout, EngineSettings};

/// Default visit length for an appliance category
pub fn duration_for_category(category: &str) -> Duration {
    let category = category.to_lowercase();
    let long_jobs = ["water heater", "hvac", "air conditioner", "furnace"];
    if long_jobs.iter().any(|c| category.contains(c)) {
        Duration::hours(3)
    } else {
        Duration::hours(2)
    }
}

/// Earliest permitted slot start: never the same UTC day as `now`
pub fn earliest_start(now: DateTime<Utc>, min_lead_time_hours: u32) -> DateTime<Utc> {
    let next_midnight = now
        .date_naive()
        .succ_opt()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(now);
    next_midnight.max(now + Duration::hours(i64::from(min_lead_time_hours)))
}

pub struct AvailabilityChecker {
    calendar: Arc<dyn CalendarService>,
    settings: EngineSettings,
}

impl AvailabilityChecker {
    pub fn new(calendar: Arc<dyn CalendarService>, settings: EngineSettings) -> Self {
        Self { calendar, settings }
    }

    /// Search constraints for an asset category and optional caller window
    pub fn slot_request(
        &self,
        asset_category: &str,
        window: Option<&TimeWindow>,
        duration_hint: Option<Duration>,
        now: DateTime<Utc>,
    ) -> SlotRequest {
        let mut earliest = earliest_start(now, self.settings.min_lead_time_hours);
        if let Some(window) = window {
            earliest = earliest.max(window.start);
        }
        let latest = window
            .and_then(|w| w.end)
            .unwrap_or_else(|| earliest + Duration::days(i64::from(self.settings.search_horizon_days)));

        SlotRequest {
            asset_category: asset_category.to_string(),
            earliest,
            latest,
            duration: duration_hint
                .filter(|d| *d > Duration::zero())
                .unwrap_or_else(|| duration_for_category(asset_category)),
        }
    }

    pub async fn find_slot(
        &self,
        asset_category: &str,
        window: Option<&TimeWindow>,
        duration_hint: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Availability {
        let request = self.slot_request(asset_category, window, duration_hint, now);
        if request.latest <= request.earliest {
            return Availability::NoSlotAvailable;
        }

        let result = with_timeout(
            self.settings.timeouts.calendar,
            "find_slot",
            self.calendar.find_slot(request),
        )
        .await;

        match result {
            Ok(Some(slot)) => Availability::Slot(slot),
            Ok(None) => Availability::NoSlotAvailable,
            Err(err) => {
                tracing::debug!(err_code = err.code(), "Calendar unavailable");
                Availability::CalendarUnavailable {
                    reason: err.to_string(),
                }
            }
        }
    }
}

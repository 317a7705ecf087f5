use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A time window proposed or booked for internal maintenance
///
/// Owned by the external calendar; dispatch records only keep the opaque
/// booking id plus the scheduled start for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarSlot {
    pub fn new(start: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &CalendarSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Caller-requested window for the repair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// UTC day used as the issue window for idempotency
    pub fn issue_day(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

//! In-memory calendar
//!
//! Slots start on the hour at fixed business hours (UTC) every day. Hours
//! listed as busy are unavailable every day; individual slots can also be
//! marked busy. A booking occupies its slot until the process exits.

use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Timelike};
use dispatchx_core::errors::{ExError, ExErrorKind};
use dispatchx_core::model::CalendarSlot;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::collaborators::{CalendarService, SlotRequest};

pub const DEFAULT_BUSINESS_HOURS: [u32; 6] = [9, 10, 11, 13, 14, 15];
pub const DEFAULT_BUSY_HOURS: [u32; 2] = [9, 14];

#[derive(Debug, Clone)]
struct Booking {
    booking_id: String,
    slot: CalendarSlot,
}

#[derive(Debug, Default)]
struct CalendarState {
    busy: Vec<CalendarSlot>,
    bookings: HashMap<String, Booking>,
}

#[derive(Debug)]
pub struct InMemoryCalendar {
    business_hours: Vec<u32>,
    daily_busy_hours: Vec<u32>,
    state: Mutex<CalendarState>,
}

impl Default for InMemoryCalendar {
    fn default() -> Self {
        Self::new(DEFAULT_BUSINESS_HOURS.to_vec()).with_daily_busy(DEFAULT_BUSY_HOURS.to_vec())
    }
}

impl InMemoryCalendar {
    pub fn new(mut business_hours: Vec<u32>) -> Self {
        business_hours.retain(|h| *h < 24);
        business_hours.sort_unstable();
        business_hours.dedup();
        Self {
            business_hours,
            daily_busy_hours: Vec::new(),
            state: Mutex::new(CalendarState::default()),
        }
    }

    pub fn with_daily_busy(mut self, hours: Vec<u32>) -> Self {
        self.daily_busy_hours = hours;
        self
    }

    pub fn mark_busy(&self, slot: CalendarSlot) -> Result<(), ExError> {
        self.lock("mark_busy")?.busy.push(slot);
        Ok(())
    }

    /// Number of distinct bookings made so far
    pub fn booking_count(&self) -> usize {
        self.state.lock().map(|s| s.bookings.len()).unwrap_or(0)
    }

    fn lock(&self, op: &str) -> Result<std::sync::MutexGuard<'_, CalendarState>, ExError> {
        self.state.lock().map_err(|_| {
            ExError::new(ExErrorKind::Transport)
                .with_op(op.to_string())
                .with_message("calendar state poisoned")
        })
    }

    fn is_free(&self, state: &CalendarState, slot: &CalendarSlot) -> bool {
        let daily_busy = self.daily_busy_hours.contains(&slot.start.hour());

        !daily_busy
            && !state.busy.iter().any(|b| b.overlaps(slot))
            && !state.bookings.values().any(|b| b.slot.overlaps(slot))
    }
}

#[async_trait]
impl CalendarService for InMemoryCalendar {
    async fn find_slot(&self, request: SlotRequest) -> Result<Option<CalendarSlot>, ExError> {
        if request.duration <= Duration::zero() {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("find_slot")
                .with_message("slot duration must be positive"));
        }

        let state = self.lock("find_slot")?;
        let mut day = request.earliest.date_naive();
        let last_day = request.latest.date_naive();

        while day <= last_day {
            for hour in &self.business_hours {
                let Some(time) = NaiveTime::from_hms_opt(*hour, 0, 0) else {
                    continue;
                };
                let slot = CalendarSlot::new(day.and_time(time).and_utc(), request.duration);
                if slot.start >= request.earliest
                    && slot.end <= request.latest
                    && self.is_free(&state, &slot)
                {
                    return Ok(Some(slot));
                }
            }
            let Some(next) = day.succ_opt() else { break };
            day = next;
        }

        Ok(None)
    }

    async fn book(&self, slot: CalendarSlot, idempotency_key: String) -> Result<String, ExError> {
        let mut state = self.lock("book_slot")?;

        if let Some(existing) = state.bookings.get(&idempotency_key) {
            return Ok(existing.booking_id.clone());
        }

        if !self.is_free(&state, &slot) {
            return Err(ExError::new(ExErrorKind::Transport)
                .with_op("book_slot")
                .with_message(format!("slot {} is no longer free", slot.start.to_rfc3339())));
        }

        let booking_id = format!("BK-{}", uuid::Uuid::new_v4().simple());
        state.bookings.insert(
            idempotency_key,
            Booking {
                booking_id: booking_id.clone(),
                slot,
            },
        );
        tracing::debug!(booking_id = %booking_id, "Calendar slot booked");
        Ok(booking_id)
    }
}

// End-to-end dispatch scenarios: routing, side effects and the logged record

mod common;

use async_trait::async_trait;
use common::{afternoon_calendar, harness, utc, RecordingEmail, PROPERTY_MANAGER};
use dispatchx_core::errors::{ExError, ExErrorKind};
use dispatchx_core::lifecycle::DispatchState;
use dispatchx_core::model::{CalendarSlot, Outcome, Route, TimeWindow, WarrantyStatus};
use dispatchx_engine::adapters::InMemoryCalendar;
use dispatchx_engine::collaborators::{CalendarService, MockCalendarService, SlotRequest};
use dispatchx_engine::commands::engine_query::{EngineQuery, EngineQueryResult};
use dispatchx_engine::DispatchRequest;
use std::sync::Arc;
use std::time::Duration;

struct SlowCalendar;

#[async_trait]
impl CalendarService for SlowCalendar {
    async fn find_slot(&self, _request: SlotRequest) -> Result<Option<CalendarSlot>, ExError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(None)
    }

    async fn book(&self, _slot: CalendarSlot, _key: String) -> Result<String, ExError> {
        Ok("never".to_string())
    }
}

#[tokio::test]
async fn test_active_warranty_emails_manufacturer_with_correlation_id() {
    // Given: T1's dishwasher is under warranty
    let email = Arc::new(RecordingEmail::new());
    let calendar = afternoon_calendar();
    let h = harness(email.clone(), calendar.clone());

    // When
    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "dishwasher-42", "Leaking at the door"))
        .await
        .unwrap();

    // Then: one email to Acme support, nothing booked
    assert_eq!(outcome.route, Some(Route::Manufacturer));
    assert_eq!(outcome.outcome, Outcome::Sent);
    assert_eq!(outcome.state, DispatchState::Logged);
    assert_eq!(outcome.warranty_status, Some(WarrantyStatus::Active));
    assert!(!outcome.duplicate);

    let sent = email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "support@acme.example");
    assert_eq!(sent[0].correlation_id, outcome.idempotency_key);
    assert!(sent[0].body.contains(&outcome.idempotency_key));
    assert!(sent[0].body.contains("Leaking at the door"));
    assert_eq!(outcome.external_ref.as_deref(), Some("msg-1"));
    assert_eq!(calendar.booking_count(), 0);
}

#[tokio::test]
async fn test_expired_warranty_books_slot_and_emails_property_manager() {
    // Given: the fridge warranty ended 2023-01-01 and 14:00 on 2025-03-10 is free
    let email = Arc::new(RecordingEmail::new());
    let calendar = afternoon_calendar();
    let h = harness(email.clone(), calendar.clone());

    // When
    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "fridge-7", "Not cooling"))
        .await
        .unwrap();

    // Then
    assert_eq!(outcome.route, Some(Route::Internal));
    assert_eq!(outcome.outcome, Outcome::Booked);
    assert_eq!(outcome.scheduled_start, Some(utc(2025, 3, 10, 14)));
    assert!(outcome.booking_id.is_some());
    assert_eq!(outcome.external_ref, outcome.booking_id);
    assert_eq!(calendar.booking_count(), 1);

    let sent = email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, PROPERTY_MANAGER);
    assert!(sent[0].body.contains("2025-03-10T14:00:00+00:00"));
    assert!(sent[0]
        .body
        .contains(outcome.booking_id.as_deref().unwrap()));
}

#[tokio::test]
async fn test_calendar_outage_blocks_router_and_still_logs_record() {
    // Given: the calendar API is down
    let email = Arc::new(RecordingEmail::new());
    let mut calendar = MockCalendarService::new();
    calendar.expect_find_slot().times(1).returning(|_| {
        Err(ExError::new(ExErrorKind::Transport).with_message("calendar API returned 503"))
    });
    calendar.expect_book().times(0);
    let h = harness(email.clone(), Arc::new(calendar));

    // When
    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "fridge-7", "Not cooling"))
        .await
        .unwrap();

    // Then: error outcome with the router's reason, never a manufacturer email
    assert_eq!(outcome.outcome, Outcome::Error);
    assert_eq!(outcome.route, Some(Route::Failed));
    assert_eq!(outcome.state, DispatchState::Failed);
    assert_eq!(outcome.failure_code.as_deref(), Some("ERR_ROUTER_BLOCKED"));
    assert!(outcome.failure_detail.as_deref().unwrap().contains("503"));
    assert!(email.sent().is_empty());

    let stored = h
        .engine
        .query(EngineQuery::RecordGet {
            record_id: outcome.record_id.clone(),
        })
        .await
        .unwrap();
    match stored {
        EngineQueryResult::RecordGet(r) => {
            assert_eq!(r.record.state, DispatchState::Failed);
            assert_eq!(r.record.warranty_status, Some(WarrantyStatus::Expired));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_calendar_timeout_is_treated_as_unavailable() {
    let email = Arc::new(RecordingEmail::new());
    let h = harness(email.clone(), Arc::new(SlowCalendar));

    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "fridge-7", "Not cooling"))
        .await
        .unwrap();

    assert_eq!(outcome.failure_code.as_deref(), Some("ERR_ROUTER_BLOCKED"));
    assert!(outcome
        .failure_detail
        .as_deref()
        .unwrap()
        .contains("ERR_TIMEOUT"));
    assert!(email.sent().is_empty());
}

#[tokio::test]
async fn test_asset_of_another_tenant_is_not_owned() {
    // Given: oven-2 belongs to T2
    let email = Arc::new(RecordingEmail::new());
    let calendar = afternoon_calendar();
    let h = harness(email.clone(), calendar.clone());

    // When: T1 reports it
    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "oven-2", "Won't heat"))
        .await
        .unwrap();

    // Then: logged as failed, nothing sent or booked
    assert_eq!(outcome.failure_code.as_deref(), Some("ERR_ASSET_NOT_OWNED"));
    assert_eq!(outcome.state, DispatchState::Failed);
    assert_eq!(outcome.outcome, Outcome::Error);
    assert_eq!(outcome.route, Some(Route::Failed));
    assert_eq!(outcome.tenant_id.as_deref(), Some("T1"));
    assert!(outcome.asset_id.is_none());
    assert!(email.sent().is_empty());
    assert_eq!(calendar.booking_count(), 0);
}

#[tokio::test]
async fn test_partial_word_hint_does_not_pick_an_owned_asset() {
    // Given: T1 owns a dishwasher under warranty and a fridge, but no washer
    let email = Arc::new(RecordingEmail::new());
    let calendar = afternoon_calendar();
    let h = harness(email.clone(), calendar.clone());

    // When: T1 reports a washer
    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "washer", "Washer won't spin"))
        .await
        .unwrap();

    // Then: not owned; the dishwasher's manufacturer is not emailed
    assert_eq!(outcome.failure_code.as_deref(), Some("ERR_ASSET_NOT_OWNED"));
    assert_eq!(outcome.state, DispatchState::Failed);
    assert!(outcome.asset_id.is_none());
    assert!(email.sent().is_empty());
    assert_eq!(calendar.booking_count(), 0);
}

#[tokio::test]
async fn test_ambiguous_tenant_is_logged_with_candidates() {
    let email = Arc::new(RecordingEmail::new());
    let h = harness(email.clone(), afternoon_calendar());

    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("Sam", "oven", "Won't heat"))
        .await
        .unwrap();

    assert_eq!(outcome.failure_code.as_deref(), Some("ERR_AMBIGUOUS_TENANT"));
    let detail = outcome.failure_detail.unwrap();
    assert!(detail.contains("T2") && detail.contains("T3"), "{}", detail);
    assert!(outcome.tenant_id.is_none());
    assert!(outcome.idempotency_key.starts_with("unresolved:"));
    assert!(email.sent().is_empty());
}

#[tokio::test]
async fn test_unknown_tenant_is_context_unresolved() {
    let email = Arc::new(RecordingEmail::new());
    let h = harness(email.clone(), afternoon_calendar());

    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("Zelda", "fridge", "Warm"))
        .await
        .unwrap();

    assert_eq!(
        outcome.failure_code.as_deref(),
        Some("ERR_CONTEXT_UNRESOLVED")
    );
    assert_eq!(outcome.state, DispatchState::Failed);
}

#[tokio::test]
async fn test_active_warranty_never_consults_calendar() {
    // Given: a calendar that must not be touched
    let mut calendar = MockCalendarService::new();
    calendar.expect_find_slot().times(0);
    calendar.expect_book().times(0);
    let email = Arc::new(RecordingEmail::new());
    let h = harness(email.clone(), Arc::new(calendar));

    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("Tom", "acme dishwasher", "Noisy"))
        .await
        .unwrap();

    assert_eq!(outcome.route, Some(Route::Manufacturer));
    assert_eq!(email.sent().len(), 1);
}

#[tokio::test]
async fn test_warranty_expires_exactly_at_coverage_end() {
    let email = Arc::new(RecordingEmail::new());
    let h = harness(email.clone(), afternoon_calendar());

    // One second before the end: still covered
    h.clock
        .set(utc(2026, 1, 1, 0) - chrono::Duration::seconds(1));
    let before = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "dishwasher-42", "Noisy"))
        .await
        .unwrap();
    assert_eq!(before.warranty_status, Some(WarrantyStatus::Active));
    assert_eq!(before.route, Some(Route::Manufacturer));

    // At the end: expired, routed internally
    h.clock.set(utc(2026, 1, 1, 0));
    let at_end = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "dishwasher-42", "Noisy"))
        .await
        .unwrap();
    assert_eq!(at_end.warranty_status, Some(WarrantyStatus::Expired));
    assert_eq!(at_end.route, Some(Route::Internal));
    assert_eq!(at_end.scheduled_start, Some(utc(2026, 1, 2, 14)));
    assert_ne!(before.record_id, at_end.record_id);
}

#[tokio::test]
async fn test_no_free_slot_defers_without_error() {
    // Given: a calendar with no business hours at all
    let email = Arc::new(RecordingEmail::new());
    let calendar = Arc::new(InMemoryCalendar::new(Vec::new()));
    let h = harness(email.clone(), calendar.clone());

    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "fridge-7", "Not cooling"))
        .await
        .unwrap();

    assert_eq!(outcome.route, Some(Route::Internal));
    assert_eq!(outcome.outcome, Outcome::Pending);
    assert_eq!(outcome.state, DispatchState::Logged);
    assert!(outcome.retry_suggested);
    assert!(outcome.failure_code.is_none());
    assert!(email.sent().is_empty());
    assert_eq!(calendar.booking_count(), 0);
}

#[tokio::test]
async fn test_work_order_email_failure_keeps_booking() {
    let email = Arc::new(RecordingEmail::failing_for(PROPERTY_MANAGER));
    let calendar = afternoon_calendar();
    let h = harness(email.clone(), calendar.clone());

    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "fridge-7", "Not cooling"))
        .await
        .unwrap();

    assert_eq!(outcome.outcome, Outcome::Error);
    assert_eq!(outcome.route, Some(Route::Internal));
    assert_eq!(outcome.state, DispatchState::Logged);
    assert_eq!(outcome.failure_code.as_deref(), Some("ERR_TRANSPORT"));
    let booking_id = outcome.booking_id.clone().unwrap();
    assert!(outcome.failure_detail.unwrap().contains(&booking_id));
    assert_eq!(outcome.external_ref.as_deref(), Some(booking_id.as_str()));
    assert_eq!(calendar.booking_count(), 1);
}

#[tokio::test]
async fn test_slow_email_times_out_into_logged_error() {
    let email = Arc::new(RecordingEmail::slow(Duration::from_secs(3)));
    let h = harness(email.clone(), afternoon_calendar());

    let outcome = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "dishwasher-42", "Noisy"))
        .await
        .unwrap();

    assert_eq!(outcome.outcome, Outcome::Error);
    assert_eq!(outcome.route, Some(Route::Manufacturer));
    assert_eq!(outcome.state, DispatchState::Logged);
    assert_eq!(outcome.failure_code.as_deref(), Some("ERR_TIMEOUT"));
}

#[tokio::test]
async fn test_invalid_request_writes_nothing() {
    let email = Arc::new(RecordingEmail::new());
    let h = harness(email.clone(), afternoon_calendar());

    let err = h
        .engine
        .dispatch_issue(DispatchRequest::new("T1", "fridge-7", "  "))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    assert!(err.request_id().is_some());

    let inverted = DispatchRequest::new("T1", "fridge-7", "Warm").with_window(TimeWindow {
        start: utc(2025, 3, 12, 12),
        end: Some(utc(2025, 3, 12, 9)),
    });
    let err = h.engine.dispatch_issue(inverted).await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);

    match h.engine.query(EngineQuery::Stats).await.unwrap() {
        EngineQueryResult::Stats(stats) => assert_eq!(stats.records_total, 0),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_requested_window_narrows_slot_search() {
    // Given: a calendar free at 10:00 and 14:00 every day
    let email = Arc::new(RecordingEmail::new());
    let calendar = Arc::new(InMemoryCalendar::new(vec![10, 14]));
    let h = harness(email.clone(), calendar);

    // When: the tenant is only home on the afternoon of 2025-03-12
    let request = DispatchRequest::new("T1", "fridge-7", "Not cooling").with_window(TimeWindow {
        start: utc(2025, 3, 12, 12),
        end: Some(utc(2025, 3, 12, 18)),
    });
    let outcome = h.engine.dispatch_issue(request).await.unwrap();

    // Then
    assert_eq!(outcome.scheduled_start, Some(utc(2025, 3, 12, 14)));
}

#[tokio::test]
async fn test_dropped_caller_still_gets_logged_outcome() {
    let email = Arc::new(RecordingEmail::slow(Duration::from_millis(200)));
    let h = harness(email.clone(), afternoon_calendar());

    // When: the caller gives up almost immediately
    let gave_up = tokio::time::timeout(
        Duration::from_millis(1),
        h.engine
            .dispatch_issue(DispatchRequest::new("T1", "dishwasher-42", "Noisy")),
    )
    .await;
    assert!(gave_up.is_err());

    // Then: the request still finishes in the background
    let mut logged = None;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let EngineQueryResult::RecordList(page) = h
            .engine
            .query(EngineQuery::RecordList(Default::default()))
            .await
            .unwrap()
        {
            if let Some(record) = page.items.into_iter().find(|r| r.is_terminal()) {
                logged = Some(record);
                break;
            }
        }
    }
    let record = logged.expect("record reached a terminal state");
    assert_eq!(record.state, DispatchState::Logged);
    assert_eq!(record.outcome, Outcome::Sent);
    assert_eq!(email.sent().len(), 1);
}

#![allow(clippy::unwrap_used, clippy::expect_used)]

use dispatchx_core::errors::{DispatchError, ExError, ExErrorKind};
use dispatchx_core::logging_facility::test_capture::init_test_capture;
use dispatchx_core::{log_op_end, log_op_error, log_op_start};
use dispatchx_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_carries_fields() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, tenant_hint = "Charlie");

    let starts: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(
        starts[0].fields.get("tenant_hint").map(String::as_str),
        Some("Charlie")
    );
    assert!(starts[0].component.is_some());
}

#[test]
fn test_log_op_end_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42, route = "internal");

    let ends: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .collect();
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].fields.get("duration_ms"), Some(&"42".to_string()));
    assert_eq!(ends[0].fields.get("route"), Some(&"internal".to_string()));
}

#[test]
fn test_log_op_error_accepts_domain_errors() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = DispatchError::AssetNotOwned {
        tenant_id: "T1".to_string(),
        asset_hint: "oven".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let errors: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].fields.get("err_code"),
        Some(&"ERR_ASSET_NOT_OWNED".to_string())
    );
    assert_eq!(errors[0].level, tracing::Level::ERROR);
}

#[test]
fn test_log_op_error_accepts_structured_errors() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_4";

    let err = ExError::new(ExErrorKind::Timeout).with_op("send_email");
    log_op_error!(op_name, err, duration_ms = 500, request_id = "req-4");

    let event = capture
        .events_for_op(op_name)
        .into_iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("error event");
    assert_eq!(event.fields.get("err_code"), Some(&"ERR_TIMEOUT".to_string()));
    assert_eq!(event.fields.get("request_id"), Some(&"req-4".to_string()));
}

#[test]
fn test_boundary_ownership_single_start_end() {
    let capture = init_test_capture();
    let op_name = "test_boundary_ownership_unique_5";

    log_op_start!(op_name, record_id = "r1");
    log_op_end!(op_name, duration_ms = 3);

    assert_eq!(
        capture.count_events(|e| e.op.as_deref() == Some(op_name)),
        2
    );
    capture.assert_event_exists(op_name, EVENT_START);
    capture.assert_event_exists(op_name, EVENT_END);
}

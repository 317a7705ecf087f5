// Integration tests for read-only monitoring queries

mod common;

use chrono::Duration;
use common::{now, requested_record, seed_charlie, temp_store};
use dispatchx_core::errors::ExErrorKind;
use dispatchx_core::lifecycle::DispatchState;
use dispatchx_core::model::{Outcome, Route};
use dispatchx_store::query::{dispatch_stats, fetch_record, list_records, RecordCursor, RecordFilter};
use dispatchx_store::repo::RecordRepo;

fn seed_records(conn: &rusqlite::Connection) {
    for i in 0..5 {
        let mut record = requested_record(
            &format!("R{}", i),
            &format!("key-{}", i),
            now() + Duration::minutes(i),
        );
        record.state = DispatchState::Failed;
        record.outcome = if i % 2 == 0 { Outcome::Error } else { Outcome::Pending };
        record.route = Some(if i < 3 { Route::Failed } else { Route::Internal });
        RecordRepo::claim(conn, &record).unwrap();
    }
}

#[test]
fn test_list_is_newest_first_and_resumes_after_cursor() {
    let t = temp_store();
    seed_charlie(&t.store);
    let conn = t.store.connect().unwrap();
    seed_records(&conn);

    let first_page = list_records(&conn, &RecordFilter::default(), 2).unwrap();
    let ids: Vec<_> = first_page.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["R4", "R3"]);

    let last = first_page.last().unwrap();
    let filter = RecordFilter {
        after: Some(RecordCursor {
            created_at_ms: last.created_at.timestamp_millis(),
            id: last.id.clone(),
        }),
        ..RecordFilter::default()
    };
    let second_page = list_records(&conn, &filter, 10).unwrap();
    let ids: Vec<_> = second_page.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["R2", "R1", "R0"]);
}

#[test]
fn test_filters_combine() {
    let t = temp_store();
    seed_charlie(&t.store);
    let conn = t.store.connect().unwrap();
    seed_records(&conn);

    let filter = RecordFilter {
        route: Some(Route::Failed),
        outcome: Some(Outcome::Error),
        ..RecordFilter::default()
    };
    let ids: Vec<_> = list_records(&conn, &filter, 10)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["R2", "R0"]);

    let window = RecordFilter {
        from: Some(now() + Duration::minutes(1)),
        to: Some(now() + Duration::minutes(3)),
        ..RecordFilter::default()
    };
    let ids: Vec<_> = list_records(&conn, &window, 10)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["R2", "R1"]);
}

#[test]
fn test_fetch_missing_record_is_not_found() {
    let t = temp_store();
    let conn = t.store.connect().unwrap();

    let err = fetch_record(&conn, "nope").unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(err.entity_id(), Some("nope"));
}

#[test]
fn test_stats_count_tenants_warranties_and_records() {
    let t = temp_store();
    seed_charlie(&t.store);
    let conn = t.store.connect().unwrap();
    seed_records(&conn);
    RecordRepo::claim(&conn, &requested_record("R9", "key-9", now())).unwrap();

    let stats = dispatch_stats(&conn, now()).unwrap();

    assert_eq!(stats.tenants, 1);
    assert_eq!(stats.assets_under_warranty, 1);
    assert_eq!(stats.records_total, 6);
    assert_eq!(stats.records_in_flight, 1);
    assert_eq!(stats.by_route.get("failed"), Some(&3));
    assert_eq!(stats.by_route.get("internal"), Some(&2));
    assert_eq!(stats.by_route.get("undecided"), Some(&1));
    assert_eq!(stats.by_outcome.get("error"), Some(&3));
}

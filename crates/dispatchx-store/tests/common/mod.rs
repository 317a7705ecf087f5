// Shared fixtures for dispatchx-store integration tests
#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use dispatchx_core::lifecycle::DispatchState;
use dispatchx_core::model::{Asset, DispatchRecord, Outcome, Tenant, WarrantyRecord};
use dispatchx_store::repo::ContextRepo;
use dispatchx_store::ContextStore;
use tempfile::TempDir;

pub struct TestStore {
    pub store: ContextStore,
    // Held so the directory outlives the test
    pub _dir: TempDir,
}

pub fn temp_store() -> TestStore {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = ContextStore::open(dir.path().join("dispatch.db")).expect("open store");
    TestStore { store, _dir: dir }
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap()
}

/// Charlie in unit 205 with a covered fridge and an expired dishwasher
pub fn seed_charlie(store: &ContextStore) {
    let conn = store.connect().unwrap();
    ContextRepo::upsert_tenant(
        &conn,
        &Tenant::new("T205", "Charlie", "205", "charlie@example.com"),
        now(),
    )
    .unwrap();

    for (id, category, manufacturer, serial) in [
        ("fridge-205", "refrigerator", "LG", "SN-REF-205"),
        ("dw-205", "dishwasher", "Bosch", "SN-DW-205"),
    ] {
        ContextRepo::upsert_asset(
            &conn,
            &Asset {
                id: id.to_string(),
                tenant_id: "T205".to_string(),
                category: category.to_string(),
                manufacturer: manufacturer.to_string(),
                model: "M1".to_string(),
                serial_number: Some(serial.to_string()),
                installed_on: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                support_contact: format!("service@{}.example", manufacturer.to_lowercase()),
            },
            now(),
        )
        .unwrap();
    }

    ContextRepo::upsert_warranty(
        &conn,
        &WarrantyRecord {
            id: "fridge-205:w1".to_string(),
            asset_id: "fridge-205".to_string(),
            coverage_start: now() - Duration::days(365),
            coverage_end: now() + Duration::days(365),
        },
        now(),
    )
    .unwrap();
    ContextRepo::upsert_warranty(
        &conn,
        &WarrantyRecord {
            id: "dw-205:w1".to_string(),
            asset_id: "dw-205".to_string(),
            coverage_start: now() - Duration::days(900),
            coverage_end: now() - Duration::days(200),
        },
        now(),
    )
    .unwrap();
}

/// A freshly requested record for Charlie's fridge
pub fn requested_record(id: &str, key: &str, created_at: DateTime<Utc>) -> DispatchRecord {
    DispatchRecord {
        id: id.to_string(),
        idempotency_key: key.to_string(),
        tenant_hint: "Charlie".to_string(),
        asset_hint: "fridge".to_string(),
        tenant_id: Some("T205".to_string()),
        asset_id: Some("fridge-205".to_string()),
        issue_description: "Fridge is leaking".to_string(),
        warranty_status: None,
        route: None,
        outcome: Outcome::Pending,
        state: DispatchState::Requested,
        failure_code: None,
        failure_detail: None,
        external_ref: None,
        booking_id: None,
        message_id: None,
        scheduled_start: None,
        supersedes: None,
        created_at,
        decided_at: None,
        executed_at: None,
    }
}

// Shared fixtures for dispatchx-engine integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use dispatchx_core::clock::FixedClock;
use dispatchx_core::errors::{ExError, ExErrorKind};
use dispatchx_core::model::{Asset, Tenant, WarrantyRecord};
use dispatchx_engine::adapters::InMemoryCalendar;
use dispatchx_engine::collaborators::{CalendarService, EmailSender, OutboundEmail};
use dispatchx_engine::{DispatchEngine, EngineSettings, TimeoutConfig};
use dispatchx_store::repo::ContextRepo;
use dispatchx_store::ContextStore;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const PROPERTY_MANAGER: &str = "pm@building.example";

/// 2025-03-09 10:00 UTC; the next-day rule makes 2025-03-10 the first bookable day
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 9, 10, 0, 0).unwrap()
}

pub fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn settings() -> EngineSettings {
    EngineSettings {
        property_manager_email: PROPERTY_MANAGER.to_string(),
        timeouts: TimeoutConfig {
            calendar: std::time::Duration::from_millis(500),
            email: std::time::Duration::from_millis(500),
            duplicate_wait: std::time::Duration::from_secs(10),
            duplicate_poll: std::time::Duration::from_millis(10),
            ..TimeoutConfig::default()
        },
        ..EngineSettings::default()
    }
}

/// Email sender that keeps every message in memory
#[derive(Default)]
pub struct RecordingEmail {
    sent: Mutex<Vec<OutboundEmail>>,
    fail_to: Option<String>,
    delay: Option<std::time::Duration>,
}

impl RecordingEmail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send to `recipient` fails with a transport error
    pub fn failing_for(recipient: &str) -> Self {
        Self {
            fail_to: Some(recipient.to_string()),
            ..Self::default()
        }
    }

    /// Sends take `delay` before completing
    pub fn slow(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmail {
    async fn send(&self, email: OutboundEmail) -> Result<String, ExError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_to.as_deref() == Some(email.to.as_str()) {
            return Err(ExError::new(ExErrorKind::Transport)
                .with_op("send_email")
                .with_message("mailbox unavailable"));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email);
        Ok(format!("msg-{}", sent.len()))
    }
}

pub struct Harness {
    pub engine: DispatchEngine,
    pub store: ContextStore,
    pub clock: Arc<FixedClock>,
    // Held so the directory outlives the test
    pub _dir: TempDir,
}

/// Engine over a fresh seeded store with the given collaborators
pub fn harness(email: Arc<dyn EmailSender>, calendar: Arc<dyn CalendarService>) -> Harness {
    harness_with_settings(email, calendar, settings())
}

pub fn harness_with_settings(
    email: Arc<dyn EmailSender>,
    calendar: Arc<dyn CalendarService>,
    settings: EngineSettings,
) -> Harness {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = ContextStore::open(dir.path().join("dispatch.db")).expect("open store");
    seed_building(&store);
    let clock = Arc::new(FixedClock::new(now()));
    let engine = DispatchEngine::new(store.clone(), email, calendar, clock.clone(), settings);
    Harness {
        engine,
        store,
        clock,
        _dir: dir,
    }
}

/// Calendar with a single 14:00 slot per day
pub fn afternoon_calendar() -> Arc<InMemoryCalendar> {
    Arc::new(InMemoryCalendar::new(vec![14]))
}

pub fn asset(
    id: &str,
    tenant_id: &str,
    category: &str,
    manufacturer: &str,
    support_contact: &str,
) -> Asset {
    Asset {
        id: id.to_string(),
        tenant_id: tenant_id.to_string(),
        category: category.to_string(),
        manufacturer: manufacturer.to_string(),
        model: format!("{}-1", manufacturer.to_uppercase()),
        serial_number: Some(format!("SN-{}", id.to_uppercase())),
        installed_on: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        support_contact: support_contact.to_string(),
    }
}

/// Tenant T1 with an Acme dishwasher under warranty until 2026-01-01 and a
/// fridge whose warranty expired 2023-01-01; two tenants named Sam share a
/// name prefix
pub fn seed_building(store: &ContextStore) {
    let conn = store.connect().unwrap();
    for tenant in [
        Tenant::new("T1", "Tom Hale", "12", "tom@example.com"),
        Tenant::new("T2", "Sam Lee", "14", "sam.lee@example.com"),
        Tenant::new("T3", "Sam Park", "15", "sam.park@example.com"),
    ] {
        ContextRepo::upsert_tenant(&conn, &tenant, now()).unwrap();
    }

    ContextRepo::upsert_asset(
        &conn,
        &asset("dishwasher-42", "T1", "dishwasher", "Acme", "support@acme.example"),
        now(),
    )
    .unwrap();
    ContextRepo::upsert_asset(
        &conn,
        &asset("fridge-7", "T1", "refrigerator", "Frost", "support@frost.example"),
        now(),
    )
    .unwrap();
    ContextRepo::upsert_asset(
        &conn,
        &asset("oven-2", "T2", "oven", "Acme", "support@acme.example"),
        now(),
    )
    .unwrap();

    for (id, asset_id, start, end) in [
        ("dishwasher-42:w1", "dishwasher-42", utc(2024, 1, 1, 0), utc(2026, 1, 1, 0)),
        ("fridge-7:w1", "fridge-7", utc(2020, 1, 1, 0), utc(2023, 1, 1, 0)),
    ] {
        ContextRepo::upsert_warranty(
            &conn,
            &WarrantyRecord {
                id: id.to_string(),
                asset_id: asset_id.to_string(),
                coverage_start: start,
                coverage_end: end,
            },
            now(),
        )
        .unwrap();
    }
}

//! Embedded SQL migrations
//!
//! Migrations are embedded at compile time using include_str!

pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations, in application order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_context_schema",
            sql: include_str!("../../migrations/001_context_schema.sql"),
        },
        Migration {
            id: "002_dispatch_records",
            sql: include_str!("../../migrations/002_dispatch_records.sql"),
        },
        Migration {
            id: "003_email_outbox",
            sql: include_str!("../../migrations/003_email_outbox.sql"),
        },
    ]
}

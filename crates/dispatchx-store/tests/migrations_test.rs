// Integration tests for the migration framework and resulting schema

use rusqlite::Connection;

fn names_of(conn: &Connection, kind: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name")
        .unwrap();
    stmt.query_map([kind], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_apply_migrations_on_empty_db() {
    // Given: An empty SQLite database
    let mut conn = Connection::open_in_memory().expect("Failed to create in-memory database");

    // When: Migrations are applied
    let result = dispatchx_store::migrations::apply_migrations(&mut conn);

    // Then: every table exists
    assert!(result.is_ok(), "Migrations should succeed: {:?}", result.err());
    assert_eq!(
        names_of(&conn, "table"),
        vec![
            "assets",
            "dispatch_records",
            "email_outbox",
            "schema_version",
            "seed_imports",
            "tenants",
            "warranty_records",
        ]
    );
}

#[test]
fn test_ledger_guards_are_installed() {
    let mut conn = Connection::open_in_memory().unwrap();
    dispatchx_store::migrations::apply_migrations(&mut conn).unwrap();

    let triggers = names_of(&conn, "trigger");
    assert!(triggers.contains(&"dispatch_records_terminal_immutable".to_string()));
    assert!(triggers.contains(&"dispatch_records_append_only".to_string()));
}

#[test]
fn test_store_open_is_idempotent_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("dispatch.db");

    dispatchx_store::ContextStore::open(&path).unwrap();
    let store = dispatchx_store::ContextStore::open(&path).unwrap();

    let conn = store.connect().unwrap();
    let applied = dispatchx_store::migrations::applied_migrations(&conn).unwrap();
    assert_eq!(applied.len(), 3);
}

//! Error helpers for dispatchx-store
//!
//! Wraps the core `ExError` facility with store-specific constructors.

use dispatchx_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Message raised by the append-only trigger on `dispatch_records`
pub(crate) const TERMINAL_TRIGGER_MESSAGE: &str = "dispatch record is terminal";

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a seed validation error
pub fn seed_validation(reason: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("seed_parse")
        .with_message(reason.to_string())
}

/// Create a database error from rusqlite::Error
///
/// Trigger aborts from the append-only guard surface as `RecordImmutable`.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let message = err.to_string();
    if message.contains(TERMINAL_TRIGGER_MESSAGE) {
        return ExError::new(ExErrorKind::RecordImmutable)
            .with_op("sqlite")
            .with_message(message);
    }
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(message)
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create a column decoding error
pub fn corrupt_column(column: &str, value: &str) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("decode_row")
        .with_message(format!("column {} holds unreadable value '{}'", column, value))
}

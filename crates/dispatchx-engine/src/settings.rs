//! Engine settings and per-operation timeouts

use dispatchx_core::errors::{ExError, ExErrorKind};
use std::future::Future;
use std::time::Duration;

/// Timeout budget for each kind of external call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// One Context Store unit of work
    pub store: Duration,
    /// One calendar lookup or booking
    pub calendar: Duration,
    /// One email send
    pub email: Duration,
    /// How long a duplicate request waits for the in-flight original
    pub duplicate_wait: Duration,
    /// Ledger polling interval while waiting
    pub duplicate_poll: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(5),
            calendar: Duration::from_secs(10),
            email: Duration::from_secs(10),
            duplicate_wait: Duration::from_secs(30),
            duplicate_poll: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Recipient of internal work orders
    pub property_manager_email: String,
    /// Extra lead time on top of the next-day rule
    pub min_lead_time_hours: u32,
    /// How far ahead the calendar is searched when no window end is given
    pub search_horizon_days: u32,
    pub timeouts: TimeoutConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            property_manager_email: "maintenance@building.example".to_string(),
            min_lead_time_hours: 0,
            search_horizon_days: 14,
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// Run `operation`, turning expiry of `limit` into an `ERR_TIMEOUT` error
pub async fn with_timeout<F, T>(limit: Duration, op: &str, operation: F) -> Result<T, ExError>
where
    F: Future<Output = Result<T, ExError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(op, timeout_ms = limit.as_millis() as u64, "Operation timed out");
            Err(ExError::new(ExErrorKind::Timeout)
                .with_op(op)
                .with_message(format!("timed out after {}ms", limit.as_millis())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_through_results() {
        let ok = with_timeout(Duration::from_secs(1), "fast", async { Ok::<_, ExError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_with_timeout_reports_expiry_as_timeout() {
        let slow = with_timeout(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ExError>(())
        })
        .await;

        let err = slow.unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Timeout);
        assert_eq!(err.op(), Some("slow"));
    }
}

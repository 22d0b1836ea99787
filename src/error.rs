//! Error handling module
//!
//! Crate-wide error aggregation. Component errors propagate to the direct
//! caller unchanged; nothing in this crate catches and hides a failure.

use crate::config::ConfigError;
use crate::event_store::EventStoreError;
use crate::notification_log::NotificationLogError;
use crate::recorder::RecorderError;
use crate::repository::RepositoryError;

/// Crate-wide Result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Aggregated error type for application-level callers
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(transparent)]
    EventStore(#[from] EventStoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    NotificationLog(#[from] NotificationLogError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LedgerError {
    /// Check if this error is a retryable concurrency conflict. Callers
    /// retry by reloading fresh state and reapplying their change.
    pub fn is_conflict(&self) -> bool {
        match self {
            LedgerError::Recorder(e) => e.is_conflict(),
            LedgerError::EventStore(e) => e.is_conflict(),
            LedgerError::Repository(RepositoryError::Store(e)) => e.is_conflict(),
            _ => false,
        }
    }
}

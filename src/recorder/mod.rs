//! Recorder module
//!
//! Durable append/read primitive over per-stream event tables.
//! Enforces optimistic concurrency via `(stream_id, stream_version)`
//! uniqueness and assigns store-wide notification sequence numbers.

mod memory;
mod postgres;
mod sqlite;

pub use memory::MemoryRecorder;
pub use postgres::PostgresRecorder;
pub use sqlite::SqliteRecorder;

use async_trait::async_trait;
use uuid::Uuid;

/// One persisted domain event or snapshot.
///
/// Immutable once committed; `(stream_id, stream_version)` is unique per
/// table and is the sole concurrency-control mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub stream_id: Uuid,
    pub stream_version: i64,
    pub kind: String,
    pub payload: Vec<u8>,
}

/// A stored record plus its position in the store-wide append order.
///
/// The `id` is assigned exactly once, at commit time, and is strictly
/// increasing across all streams. The sequence may contain gaps where a
/// rolled-back append burned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: i64,
    pub record: StoredRecord,
}

/// High-water mark of an upstream notification feed that a downstream
/// consumer has durably processed.
///
/// Committed in the same transaction as the records it causally produced,
/// which is what makes chained processing exactly-once in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracking {
    pub consumer: String,
    pub notification_id: i64,
}

impl Tracking {
    pub fn new(consumer: impl Into<String>, notification_id: i64) -> Self {
        Self {
            consumer: consumer.into(),
            notification_id,
        }
    }
}

/// Errors that can occur in a recorder
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// Optimistic concurrency conflict: the stream already has this version
    #[error("concurrency conflict: stream {stream_id} already has version {stream_version}")]
    Conflict {
        stream_id: Uuid,
        stream_version: i64,
    },

    /// The consumer has already recorded this (or a later) notification
    #[error("tracking conflict: consumer '{consumer}' already processed notification {notification_id}")]
    TrackingConflict {
        consumer: String,
        notification_id: i64,
    },

    /// Storage failure; not retried at this layer
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

impl RecorderError {
    /// Check if this error is a concurrency conflict (stream or tracking)
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RecorderError::Conflict { .. } | RecorderError::TrackingConflict { .. }
        )
    }

    /// Check if this error is safely retryable after reloading fresh state
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }
}

/// Base capability: transactional append and per-stream range reads.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Atomically insert all records, optionally co-committing a tracking
    /// position. Rejected as a whole with [`RecorderError::Conflict`] if any
    /// `(stream_id, stream_version)` already exists, or with
    /// [`RecorderError::TrackingConflict`] if the consumer has already
    /// recorded an equal-or-greater notification id. No partial state is
    /// ever visible.
    async fn append(
        &self,
        records: &[StoredRecord],
        tracking: Option<&Tracking>,
    ) -> Result<(), RecorderError>;

    /// Read records for one stream, ordered by version. Pure range query:
    /// `gt` is an exclusive lower bound, `lte` an inclusive upper bound.
    async fn read(
        &self,
        stream_id: Uuid,
        gt: Option<i64>,
        lte: Option<i64>,
        desc: bool,
        limit: Option<i64>,
    ) -> Result<Vec<StoredRecord>, RecorderError>;
}

/// Optional capability: the globally ordered notification feed.
#[async_trait]
pub trait NotificationFeed: Send + Sync {
    /// Select notifications with `id >= start`, ascending, at most `limit`
    /// items. Gaps in the sequence are skipped transparently; the result
    /// simply contains fewer items near a gap.
    async fn select_notifications(
        &self,
        start: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, RecorderError>;

    /// The highest committed notification id, 0 if the store is empty.
    /// Progress/liveness probe; not needed for pagination correctness.
    async fn max_notification_id(&self) -> Result<i64, RecorderError>;
}

/// Optional capability: consumer tracking positions.
#[async_trait]
pub trait ConsumerTracking: Send + Sync {
    /// The highest notification id recorded for this consumer, 0 if the
    /// consumer has never tracked anything.
    async fn max_tracking_id(&self, consumer: &str) -> Result<i64, RecorderError>;
}

/// Shared detection for the SQL backends: a unique-key violation is the
/// optimistic-concurrency signal, everything else is a storage failure.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Full recorder surface: append/read plus feed plus tracking.
///
/// One backend type implements all three capabilities; components that only
/// need a slice of the surface take the narrower trait object.
pub trait ApplicationRecorder: Recorder + NotificationFeed + ConsumerTracking {}

impl<T: Recorder + NotificationFeed + ConsumerTracking> ApplicationRecorder for T {}

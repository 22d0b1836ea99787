//! eventledger Library
//!
//! Event-sourced persistence engine: immutable, versioned event streams with
//! optimistic concurrency control, snapshot-accelerated aggregate
//! reconstruction, a paginated notification feed for downstream consumers,
//! and atomic consumer tracking for exactly-once chained processing.

pub mod aggregate;
pub mod application;
pub mod config;
pub mod db;
mod error;
pub mod event_store;
pub mod notification_log;
pub mod recorder;
pub mod repository;

pub use aggregate::{Aggregate, Snapshot, SNAPSHOT_KIND};
pub use application::Application;
pub use config::{Config, ConfigError};
pub use error::{LedgerError, LedgerResult};
pub use event_store::{Codec, CodecError, EventStore, EventStoreError, JsonCodec, Recordable};
pub use notification_log::{
    LocalNotificationLog, NotificationLogError, Section, DEFAULT_SECTION_SIZE,
};
pub use recorder::{
    ApplicationRecorder, ConsumerTracking, MemoryRecorder, Notification, NotificationFeed,
    PostgresRecorder, Recorder, RecorderError, SqliteRecorder, StoredRecord, Tracking,
};
pub use repository::{Repository, RepositoryError};

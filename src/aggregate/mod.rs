//! Aggregate module
//!
//! The boundary to the domain model: aggregates are reconstructed by folding
//! their events in version order, starting from `Default::default()`. How an
//! event mutates state belongs to the domain; this crate only requires the
//! fold to be expressible.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event_store::Recordable;

/// Aggregate trait that all event-sourced entities must implement
pub trait Aggregate: Default + Serialize + DeserializeOwned + Send + Sync {
    /// The type of events this aggregate handles
    type Event: Recordable;

    /// Get the aggregate type name (for logging and diagnostics)
    fn aggregate_type() -> &'static str;

    /// Get the aggregate ID
    fn id(&self) -> Uuid;

    /// Get the current version (number of events applied)
    fn version(&self) -> i64;

    /// Apply an event to produce the next state. Must be pure: same event on
    /// same state always yields the same result.
    fn apply(self, event: Self::Event) -> Self;
}

/// Kind tag shared by all snapshot records.
pub const SNAPSHOT_KIND: &str = "snapshot";

/// The full folded state of an aggregate at a given version, stored as a
/// record in a parallel snapshot stream keyed by the same stream id.
///
/// Snapshots are a replay shortcut, never a source of truth: replaying from
/// a snapshot plus the event suffix is equivalent to replaying everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<A> {
    stream_id: Uuid,
    stream_version: i64,
    state: A,
}

impl<A: Aggregate> Snapshot<A> {
    /// Capture the aggregate's current state as a snapshot at its version.
    pub fn take(aggregate: A) -> Self {
        Self {
            stream_id: aggregate.id(),
            stream_version: aggregate.version(),
            state: aggregate,
        }
    }

    /// The version this snapshot was taken at.
    pub fn stream_version(&self) -> i64 {
        self.stream_version
    }

    /// Unwrap into the captured aggregate state.
    pub fn into_state(self) -> A {
        self.state
    }
}

impl<A: Aggregate> Recordable for Snapshot<A> {
    fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    fn stream_version(&self) -> i64 {
        self.stream_version
    }

    fn kind(&self) -> &'static str {
        SNAPSHOT_KIND
    }
}

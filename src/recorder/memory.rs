//! In-memory recorder
//!
//! Reference implementation of the recorder capabilities backed by plain
//! collections. Used by unit tests and for prototyping; semantics match the
//! SQL backends exactly, including all-or-nothing appends.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    ConsumerTracking, Notification, NotificationFeed, Recorder, RecorderError, StoredRecord,
    Tracking,
};

#[derive(Debug, Default)]
struct MemoryInner {
    /// Per-stream records keyed by version
    streams: HashMap<Uuid, BTreeMap<i64, StoredRecord>>,

    /// Committed notifications keyed by sequence id
    notifications: BTreeMap<i64, StoredRecord>,

    /// Highest tracked notification id per consumer
    tracking: HashMap<String, i64>,

    /// Next notification id to assign (ids start at 1)
    next_notification_id: i64,
}

/// Recorder backed by in-process collections behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    inner: Mutex<MemoryInner>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Recorder for MemoryRecorder {
    async fn append(
        &self,
        records: &[StoredRecord],
        tracking: Option<&Tracking>,
    ) -> Result<(), RecorderError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        // Validate the whole batch before touching any state, so a conflict
        // anywhere leaves nothing behind.
        let mut batch_keys = Vec::with_capacity(records.len());
        for record in records {
            let key = (record.stream_id, record.stream_version);
            let exists = inner
                .streams
                .get(&record.stream_id)
                .map(|stream| stream.contains_key(&record.stream_version))
                .unwrap_or(false);
            if exists || batch_keys.contains(&key) {
                tracing::warn!(
                    stream_id = %record.stream_id,
                    stream_version = record.stream_version,
                    "append rejected: version already recorded"
                );
                return Err(RecorderError::Conflict {
                    stream_id: record.stream_id,
                    stream_version: record.stream_version,
                });
            }
            batch_keys.push(key);
        }

        if let Some(tracking) = tracking {
            let current = inner
                .tracking
                .get(&tracking.consumer)
                .copied()
                .unwrap_or(0);
            if tracking.notification_id <= current {
                tracing::warn!(
                    consumer = %tracking.consumer,
                    notification_id = tracking.notification_id,
                    current,
                    "append rejected: notification already tracked"
                );
                return Err(RecorderError::TrackingConflict {
                    consumer: tracking.consumer.clone(),
                    notification_id: tracking.notification_id,
                });
            }
        }

        for record in records {
            let id = inner.next_notification_id + 1;
            inner.next_notification_id = id;
            inner
                .streams
                .entry(record.stream_id)
                .or_default()
                .insert(record.stream_version, record.clone());
            inner.notifications.insert(id, record.clone());
        }

        if let Some(tracking) = tracking {
            inner
                .tracking
                .insert(tracking.consumer.clone(), tracking.notification_id);
        }

        Ok(())
    }

    async fn read(
        &self,
        stream_id: Uuid,
        gt: Option<i64>,
        lte: Option<i64>,
        desc: bool,
        limit: Option<i64>,
    ) -> Result<Vec<StoredRecord>, RecorderError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let mut records: Vec<StoredRecord> = match inner.streams.get(&stream_id) {
            Some(stream) => stream
                .values()
                .filter(|r| gt.map_or(true, |gt| r.stream_version > gt))
                .filter(|r| lte.map_or(true, |lte| r.stream_version <= lte))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        if desc {
            records.reverse();
        }
        if let Some(limit) = limit {
            records.truncate(limit.max(0) as usize);
        }

        Ok(records)
    }
}

#[async_trait]
impl NotificationFeed for MemoryRecorder {
    async fn select_notifications(
        &self,
        start: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, RecorderError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        Ok(inner
            .notifications
            .range(start..)
            .take(limit.max(0) as usize)
            .map(|(id, record)| Notification {
                id: *id,
                record: record.clone(),
            })
            .collect())
    }

    async fn max_notification_id(&self) -> Result<i64, RecorderError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.notifications.keys().next_back().copied().unwrap_or(0))
    }
}

#[async_trait]
impl ConsumerTracking for MemoryRecorder {
    async fn max_tracking_id(&self, consumer: &str) -> Result<i64, RecorderError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.tracking.get(consumer).copied().unwrap_or(0))
    }
}

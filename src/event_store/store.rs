//! Event Store
//!
//! Thin typed facade over a recorder: `put` encodes and appends, `get` reads
//! and decodes. Generic over the record shape, so the same type serves both
//! domain events and snapshots (a parallel stream under the same stream id).

use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::recorder::{Recorder, RecorderError, Tracking};

use super::{Codec, CodecError, JsonCodec, Recordable};

/// Errors that can occur in the event store
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl EventStoreError {
    /// Check if this error is a retryable concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, EventStoreError::Recorder(e) if e.is_conflict())
    }
}

/// Typed event store over a recorder and a codec.
pub struct EventStore<E, C = JsonCodec> {
    recorder: Arc<dyn Recorder>,
    codec: C,
    _events: PhantomData<fn() -> E>,
}

impl<E: Recordable> EventStore<E> {
    /// Create an event store with the default JSON codec.
    pub fn new(recorder: Arc<dyn Recorder>) -> Self {
        Self::with_codec(recorder, JsonCodec)
    }
}

impl<E: Recordable, C: Codec<E>> EventStore<E, C> {
    /// Create an event store with a custom codec.
    pub fn with_codec(recorder: Arc<dyn Recorder>, codec: C) -> Self {
        Self {
            recorder,
            codec,
            _events: PhantomData,
        }
    }

    /// Encode the given events and append them atomically, passing the
    /// recorder's verdict through verbatim. `tracking` is co-committed when
    /// supplied (see [`Recorder::append`]).
    pub async fn put(
        &self,
        events: &[E],
        tracking: Option<&Tracking>,
    ) -> Result<(), EventStoreError> {
        let mut records = Vec::with_capacity(events.len());
        for event in events {
            records.push(self.codec.encode(event)?);
        }
        self.recorder.append(&records, tracking).await?;
        Ok(())
    }

    /// Read events for one stream in version order, decoding each record.
    /// A record whose kind cannot be decoded fails the whole read.
    pub async fn get(
        &self,
        stream_id: Uuid,
        gt: Option<i64>,
        lte: Option<i64>,
        desc: bool,
        limit: Option<i64>,
    ) -> Result<Vec<E>, EventStoreError> {
        let records = self.recorder.read(stream_id, gt, lte, desc, limit).await?;
        let mut events = Vec::with_capacity(records.len());
        for record in &records {
            events.push(self.codec.decode(record)?);
        }
        Ok(events)
    }
}

impl<E, C: Clone> Clone for EventStore<E, C> {
    fn clone(&self) -> Self {
        Self {
            recorder: Arc::clone(&self.recorder),
            codec: self.codec.clone(),
            _events: PhantomData,
        }
    }
}

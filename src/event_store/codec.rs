//! Codec boundary
//!
//! Translates domain events to stored records and back. The default codec
//! serializes payloads as JSON; the per-kind decoder registry is the serde
//! `#[serde(tag = "type")]` enum tag, so decoding an unregistered kind fails
//! loudly instead of being skipped.

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::recorder::StoredRecord;

/// A record shape the event store can persist: anything that carries its
/// stream identity, version, and type tag. Implemented by domain event enums
/// and by [`Snapshot`](crate::aggregate::Snapshot).
pub trait Recordable: Serialize + DeserializeOwned + Send + Sync {
    /// The stream this record belongs to
    fn stream_id(&self) -> Uuid;

    /// The record's position within its stream (starts at 1)
    fn stream_version(&self) -> i64;

    /// The type tag stored alongside the payload
    fn kind(&self) -> &'static str;
}

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Failed to serialize an event for storage
    #[error("failed to encode event of kind '{kind}': {source}")]
    Encode {
        kind: String,
        source: serde_json::Error,
    },

    /// Unregistered or malformed kind/payload. Fatal for the affected read;
    /// never silently skipped.
    #[error("failed to decode record of kind '{kind}': {source}")]
    Decode {
        kind: String,
        source: serde_json::Error,
    },
}

/// Pluggable translation between events and stored records.
pub trait Codec<E>: Send + Sync {
    fn encode(&self, event: &E) -> Result<StoredRecord, CodecError>;
    fn decode(&self, record: &StoredRecord) -> Result<E, CodecError>;
}

/// Default codec: JSON payloads via serde.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<E: Recordable> Codec<E> for JsonCodec {
    fn encode(&self, event: &E) -> Result<StoredRecord, CodecError> {
        let payload = serde_json::to_vec(event).map_err(|source| CodecError::Encode {
            kind: event.kind().to_string(),
            source,
        })?;
        Ok(StoredRecord {
            stream_id: event.stream_id(),
            stream_version: event.stream_version(),
            kind: event.kind().to_string(),
            payload,
        })
    }

    fn decode(&self, record: &StoredRecord) -> Result<E, CodecError> {
        serde_json::from_slice(&record.payload).map_err(|source| CodecError::Decode {
            kind: record.kind.clone(),
            source,
        })
    }
}

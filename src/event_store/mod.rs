//! Event Store module
//!
//! Typed facade between domain events and stored records. Encoding and
//! decoding go through a pluggable codec; durability is delegated to a
//! recorder.

mod codec;
mod store;

pub use codec::{Codec, CodecError, JsonCodec, Recordable};
pub use store::{EventStore, EventStoreError};

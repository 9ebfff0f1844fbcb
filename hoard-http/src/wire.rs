//! Protobuf messages exchanged between peers.
//!
//! The messages are small enough that the fields are declared inline with
//! prost derives; no schema compilation step is involved.

use bytes::Bytes;

/// Body of a successful peer fetch: the opaque value bytes.
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetResponse {
    /// The cached value for the requested key.
    #[prost(bytes = "bytes", tag = "1")]
    pub value: Bytes,
}

//! Error types for cache operations.

use std::sync::Arc;

use thiserror::Error;

/// Boxed error produced by user loaders and peer transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [`Group::get`](crate::Group::get).
///
/// The type is `Clone` (sources are reference-counted) because a single load
/// outcome is multicast verbatim to every caller coalesced onto the same
/// in-flight execution.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The user loader failed. Nothing was cached; the error is returned to
    /// every coalesced caller.
    #[error("loader failed: {0}")]
    Loader(Arc<BoxError>),

    /// Fetching from the owner peer failed (transport, remote server, or
    /// response decoding). The group falls back to its local loader on this
    /// kind, so it reaches callers only through logs and counters.
    #[error("peer fetch failed: {0}")]
    Peer(Arc<BoxError>),

    /// The caller executing the in-flight load was dropped before it
    /// completed. Waiters receive this error; the next call for the key
    /// starts a fresh execution.
    #[error("in-flight load was dropped before completing")]
    FlightDropped,
}

impl CacheError {
    /// Wraps a user-loader failure.
    pub fn loader(err: impl Into<BoxError>) -> Self {
        CacheError::Loader(Arc::new(err.into()))
    }

    /// Wraps a peer-transport failure.
    pub fn peer(err: impl Into<BoxError>) -> Self {
        CacheError::Peer(Arc::new(err.into()))
    }
}

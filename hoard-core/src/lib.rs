#![warn(missing_docs)]
//! # hoard-core
//!
//! Pure data structures underpinning the hoard distributed cache.
//!
//! This crate has no I/O and no concurrency of its own. It provides:
//!
//! - [`Ring`] — a consistent-hash ring mapping keys to owner peers with
//!   bounded disruption under membership change.
//! - [`Lru`] — a fixed-capacity recency-ordered map with an eviction
//!   callback, wrapped by callers that need synchronization.
//!
//! Both structures are composed into the cache proper by the `hoard` crate;
//! the ring additionally backs peer selection in `hoard-http`.

pub mod lru;
pub mod ring;

pub use lru::Lru;
pub use ring::{Crc32Hasher, Ring, RingHasher};

/// Raw byte payload stored in cache tiers and carried between peers.
///
/// `Bytes` gives reference-counted, zero-copy cloning, so a single fill
/// result can be handed to every waiter and cache tier without copying.
pub type Raw = bytes::Bytes;

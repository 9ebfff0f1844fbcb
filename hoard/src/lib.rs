#![warn(missing_docs)]
//! # hoard
//!
//! A distributed in-memory cache library. A fleet of identical peer
//! processes cooperates to reduce load on an authoritative, expensive data
//! source: any process can serve reads for any key, but each key has exactly
//! one owner peer (by consistent hashing) responsible for performing the
//! single fill and sharing the result.
//!
//! Three mechanisms make this work under concurrent, distributed load:
//!
//! - the consistent-hash ring ([`Ring`], from `hoard-core`) routes each key
//!   to its owner with bounded disruption under membership change;
//! - the [`singleflight`] suppressor collapses concurrent work on one key,
//!   within one process, into a single execution multicast to all waiters;
//! - the [`Group`] holds a two-tier byte-budgeted LRU (an authoritative
//!   main tier plus a small hot tier of non-owned values) and composes the
//!   pieces into the read path.
//!
//! Peer transport is abstract here ([`peer::Peer`]); the `hoard-http` crate
//! provides the reference HTTP binding.
//!
//! ## Example
//!
//! ```no_run
//! use hoard::{BoxError, Group, LoaderFn, Raw};
//!
//! // Consults the database, renders a value.
//! async fn lookup_user(key: String) -> Result<Raw, BoxError> {
//!     Ok(Raw::from(format!("user:{key}")))
//! }
//!
//! # async fn run() -> Result<(), hoard::CacheError> {
//! let users = Group::builder("users", 64 << 20, LoaderFn(lookup_user)).build();
//!
//! let value = users.get("alice").await?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod group;
pub mod peer;
pub mod registry;
pub mod singleflight;
pub mod stats;

pub use error::{BoxError, CacheError};
pub use group::{CacheTier, Group, GroupBuilder, Loader, LoaderFn};
pub use peer::{NoPeers, Peer, PeerPicker, register_peer_picker};
pub use registry::Registry;
pub use singleflight::Singleflight;
pub use stats::{CacheStats, GroupStats, StatsSnapshot};

pub use hoard_core::{Crc32Hasher, Lru, Raw, Ring, RingHasher};

//! Per-group counters for cache observability.
//!
//! Counters are plain relaxed atomics: they are advisory load/hit-rate
//! telemetry, not synchronization.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// A monotonically increasing counter shared across threads.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Adds `n` to the counter.
    #[inline]
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Current counter value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters maintained by one [`Group`](crate::Group).
///
/// `loads` counts distinct load invocations and therefore equals
/// `gets - cache_hits` rather than `gets`: duplicate-call suppression
/// coalesces concurrent misses into one load.
#[derive(Debug, Default)]
pub struct GroupStats {
    /// Any get request, including cache hits.
    pub gets: Counter,
    /// Gets served from either cache tier.
    pub cache_hits: Counter,
    /// Values fetched from an owner peer.
    pub peer_loads: Counter,
    /// Failed peer fetches; the local loader ran as fallback.
    pub peer_errors: Counter,
    /// Gets that missed both tiers (before suppression).
    pub loads: Counter,
    /// Load executions remaining after duplicate suppression.
    pub loads_deduped: Counter,
    /// Values produced by the local loader.
    pub local_loads: Counter,
    /// Local loader failures.
    pub local_load_errs: Counter,
    /// Gets that arrived over the peer-server surface.
    pub server_requests: Counter,
}

impl GroupStats {
    /// A point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            gets: self.gets.get(),
            cache_hits: self.cache_hits.get(),
            peer_loads: self.peer_loads.get(),
            peer_errors: self.peer_errors.get(),
            loads: self.loads.get(),
            loads_deduped: self.loads_deduped.get(),
            local_loads: self.local_loads.get(),
            local_load_errs: self.local_load_errs.get(),
            server_requests: self.server_requests.get(),
        }
    }
}

/// A point-in-time copy of a group's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// See [`GroupStats::gets`].
    pub gets: u64,
    /// See [`GroupStats::cache_hits`].
    pub cache_hits: u64,
    /// See [`GroupStats::peer_loads`].
    pub peer_loads: u64,
    /// See [`GroupStats::peer_errors`].
    pub peer_errors: u64,
    /// See [`GroupStats::loads`].
    pub loads: u64,
    /// See [`GroupStats::loads_deduped`].
    pub loads_deduped: u64,
    /// See [`GroupStats::local_loads`].
    pub local_loads: u64,
    /// See [`GroupStats::local_load_errs`].
    pub local_load_errs: u64,
    /// See [`GroupStats::server_requests`].
    pub server_requests: u64,
}

/// A point-in-time view of one cache tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total reported bytes resident (keys plus values).
    pub bytes: u64,
    /// Resident entry count.
    pub items: u64,
    /// Lookups against this tier.
    pub gets: u64,
    /// Lookups satisfied by this tier.
    pub hits: u64,
    /// Entries removed (capacity pressure or displacement).
    pub evictions: u64,
}

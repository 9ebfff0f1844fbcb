//! Cache groups: the composition layer.
//!
//! A [`Group`] ties together the two LRU tiers, the duplicate-call
//! suppressor, peer routing, and the user's loader. Reads flow:
//! local probe → (on miss, coalesced per key) owner-peer fetch → local load.
//!
//! The group mutex guards only the cache tiers and is never held across
//! I/O; concurrent gets for distinct keys proceed in parallel after their
//! brief probe.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use async_trait::async_trait;
use rand::Rng;
use smol_str::SmolStr;
use tracing::{debug, warn};

use hoard_core::{Lru, Raw};

use crate::error::{BoxError, CacheError};
use crate::peer::{self, NoPeers, Peer, PeerPicker};
use crate::registry::Registry;
use crate::singleflight::Singleflight;
use crate::stats::{CacheStats, GroupStats};

/// The authoritative source of a group's values.
///
/// The loader must be idempotent: the cache treats it as a pure function of
/// the key within a freshness window. It is invoked by whichever peer owns
/// the key — or by any peer as a fallback when the owner is unreachable.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Produces the value for `key` from the underlying source.
    async fn load(&self, key: &str) -> Result<Raw, BoxError>;
}

/// Adapts a closure returning a future into a [`Loader`].
pub struct LoaderFn<F>(pub F);

#[async_trait]
impl<F, Fut> Loader for LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Raw, BoxError>> + Send,
{
    async fn load(&self, key: &str) -> Result<Raw, BoxError> {
        (self.0)(key.to_owned()).await
    }
}

/// The two cache tiers of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// Authoritative tier for keys this peer owns.
    Main,
    /// Small reservoir of values owned elsewhere, damping cross-peer traffic
    /// for very popular keys and during ownership moves.
    Hot,
}

/// One LRU tier with byte accounting.
///
/// Byte totals live in shared atomics so the eviction callback installed in
/// the LRU can keep them exact without reaching back into this struct.
struct ByteCache {
    lru: Lru<String, Raw>,
    nbytes: Arc<AtomicU64>,
    nevict: Arc<AtomicU64>,
    ngets: u64,
    nhits: u64,
}

impl ByteCache {
    fn new() -> Self {
        let nbytes = Arc::new(AtomicU64::new(0));
        let nevict = Arc::new(AtomicU64::new(0));
        let lru = {
            let nbytes = Arc::clone(&nbytes);
            let nevict = Arc::clone(&nevict);
            Lru::new(0).on_evict(move |key: String, value: Raw| {
                nbytes.fetch_sub((key.len() + value.len()) as u64, Ordering::Relaxed);
                nevict.fetch_add(1, Ordering::Relaxed);
            })
        };
        ByteCache {
            lru,
            nbytes,
            nevict,
            ngets: 0,
            nhits: 0,
        }
    }

    fn add(&mut self, key: &str, value: Raw) {
        self.nbytes
            .fetch_add((key.len() + value.len()) as u64, Ordering::Relaxed);
        if let Some(old) = self.lru.add(key.to_owned(), value) {
            self.nbytes
                .fetch_sub((key.len() + old.len()) as u64, Ordering::Relaxed);
        }
    }

    fn get(&mut self, key: &str) -> Option<Raw> {
        self.ngets += 1;
        let value = self.lru.get(key).cloned();
        if value.is_some() {
            self.nhits += 1;
        }
        value
    }

    fn remove(&mut self, key: &str) {
        self.lru.remove(key);
    }

    fn remove_oldest(&mut self) {
        self.lru.remove_oldest();
    }

    fn bytes(&self) -> u64 {
        self.nbytes.load(Ordering::Relaxed)
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            bytes: self.bytes(),
            items: self.lru.len() as u64,
            gets: self.ngets,
            hits: self.nhits,
            evictions: self.nevict.load(Ordering::Relaxed),
        }
    }
}

struct Tiers {
    main: ByteCache,
    hot: ByteCache,
}

/// A named namespace of cached values backed by one loader.
///
/// Cheap to share: hand out `Arc<Group>` clones freely. All operations take
/// `&self`.
pub struct Group {
    name: SmolStr,
    loader: Arc<dyn Loader>,
    /// Combined byte budget for both tiers; 0 disables caching entirely.
    cache_bytes: u64,
    /// Share of resident bytes the hot tier may hold relative to the main
    /// tier before it becomes the eviction victim.
    hot_fraction: f64,
    caches: Mutex<Tiers>,
    flight: Singleflight<Raw>,
    /// Resolved on first use: explicit override, else the process-global
    /// picker, else [`NoPeers`].
    picker: OnceLock<Arc<dyn PeerPicker>>,
    stats: GroupStats,
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache_bytes", &self.cache_bytes)
            .finish()
    }
}

impl Group {
    /// Starts building a group named `name` with a combined byte budget and
    /// the authoritative loader.
    pub fn builder(
        name: impl Into<SmolStr>,
        cache_bytes: u64,
        loader: impl Loader + 'static,
    ) -> GroupBuilder {
        GroupBuilder {
            name: name.into(),
            cache_bytes,
            loader: Arc::new(loader),
            hot_fraction: 1.0 / 8.0,
            picker: None,
        }
    }

    /// The group's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group's counters.
    pub fn stats(&self) -> &GroupStats {
        &self.stats
    }

    /// A point-in-time view of one cache tier.
    pub fn cache_stats(&self, tier: CacheTier) -> CacheStats {
        let tiers = self.lock();
        match tier {
            CacheTier::Main => tiers.main.stats(),
            CacheTier::Hot => tiers.hot.stats(),
        }
    }

    /// Fetches the value for `key`.
    ///
    /// Probes both local tiers first; on a miss, concurrent callers for the
    /// same key coalesce onto one load, which is routed to the owner peer or,
    /// when this process is the owner (or the peer fails), to the loader.
    pub async fn get(&self, key: &str) -> Result<Raw, CacheError> {
        self.stats.gets.add(1);
        if let Some(value) = self.probe(key) {
            self.stats.cache_hits.add(1);
            debug!(group = %self.name, key, "cache hit");
            return Ok(value);
        }
        self.load(key).await
    }

    async fn load(&self, key: &str) -> Result<Raw, CacheError> {
        self.stats.loads.add(1);
        self.flight
            .run(key, async {
                // Another caller may have filled the key while this one was
                // acquiring the flight slot.
                if let Some(value) = self.probe(key) {
                    self.stats.cache_hits.add(1);
                    return Ok(value);
                }
                self.stats.loads_deduped.add(1);

                if let Some(owner) = self.picker().pick_peer(key) {
                    match self.fetch_from_peer(owner.as_ref(), key).await {
                        Ok(value) => {
                            self.stats.peer_loads.add(1);
                            return Ok(value);
                        }
                        Err(err) => {
                            self.stats.peer_errors.add(1);
                            warn!(
                                group = %self.name,
                                key,
                                error = %err,
                                "peer fetch failed, loading locally"
                            );
                        }
                    }
                }

                let value = self.load_locally(key).await?;
                self.populate(key, value.clone(), CacheTier::Main);
                Ok(value)
            })
            .await
    }

    async fn fetch_from_peer(&self, owner: &dyn Peer, key: &str) -> Result<Raw, CacheError> {
        let value = owner
            .fetch(&self.name, key)
            .await
            .map_err(CacheError::peer)?;
        // Only a sampled fraction (target ~0.1) of remote results is kept;
        // remembering every one would let other owners' keys crowd the tier.
        if rand::thread_rng().gen_range(0..10) == 0 {
            self.populate(key, value.clone(), CacheTier::Hot);
        }
        Ok(value)
    }

    async fn load_locally(&self, key: &str) -> Result<Raw, CacheError> {
        match self.loader.load(key).await {
            Ok(value) => {
                self.stats.local_loads.add(1);
                Ok(value)
            }
            Err(err) => {
                self.stats.local_load_errs.add(1);
                Err(CacheError::loader(err))
            }
        }
    }

    fn probe(&self, key: &str) -> Option<Raw> {
        if self.cache_bytes == 0 {
            return None;
        }
        let mut tiers = self.lock();
        if let Some(value) = tiers.main.get(key) {
            return Some(value);
        }
        tiers.hot.get(key)
    }

    fn populate(&self, key: &str, value: Raw, tier: CacheTier) {
        if self.cache_bytes == 0 {
            return;
        }
        let mut tiers = self.lock();
        // A key lives in at most one tier per process.
        match tier {
            CacheTier::Main => {
                tiers.hot.remove(key);
                tiers.main.add(key, value);
            }
            CacheTier::Hot => {
                tiers.main.remove(key);
                tiers.hot.add(key, value);
            }
        }
        loop {
            let main_bytes = tiers.main.bytes();
            let hot_bytes = tiers.hot.bytes();
            if main_bytes + hot_bytes <= self.cache_bytes {
                return;
            }
            // The budget skews toward owned data: the hot tier is the victim
            // only once it outgrows its fraction of the main tier.
            if hot_bytes as f64 > main_bytes as f64 * self.hot_fraction {
                tiers.hot.remove_oldest();
            } else {
                tiers.main.remove_oldest();
            }
        }
    }

    fn picker(&self) -> &Arc<dyn PeerPicker> {
        self.picker.get_or_init(|| {
            peer::global_peer_picker().unwrap_or_else(|| Arc::new(NoPeers))
        })
    }

    fn lock(&self) -> MutexGuard<'_, Tiers> {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder returned by [`Group::builder`].
pub struct GroupBuilder {
    name: SmolStr,
    cache_bytes: u64,
    loader: Arc<dyn Loader>,
    hot_fraction: f64,
    picker: Option<Arc<dyn PeerPicker>>,
}

impl GroupBuilder {
    /// Routes fills through an explicit peer picker instead of the
    /// process-global one. Intended for tests and embedded setups.
    pub fn peers(mut self, picker: Arc<dyn PeerPicker>) -> Self {
        self.picker = Some(picker);
        self
    }

    /// Sets the hot tier's share of the byte budget relative to the main
    /// tier (default 1/8). Larger values let more non-owned data linger.
    pub fn hot_cache_fraction(mut self, fraction: f64) -> Self {
        self.hot_fraction = fraction;
        self
    }

    /// Builds the group and registers it in the process-global
    /// [`Registry`]. Panics if the name is already registered.
    pub fn build(self) -> Arc<Group> {
        self.build_in(&Registry::global())
    }

    /// Builds the group and registers it in an explicit registry.
    /// Panics if the name is already registered there.
    pub fn build_in(self, registry: &Registry) -> Arc<Group> {
        let group = self.build_unregistered();
        registry.register(Arc::clone(&group));
        group
    }

    /// Builds the group without registering it anywhere.
    pub fn build_unregistered(self) -> Arc<Group> {
        let picker = OnceLock::new();
        if let Some(explicit) = self.picker {
            let _ = picker.set(explicit);
        }
        Arc::new(Group {
            name: self.name,
            loader: self.loader,
            cache_bytes: self.cache_bytes,
            hot_fraction: self.hot_fraction,
            caches: Mutex::new(Tiers {
                main: ByteCache::new(),
                hot: ByteCache::new(),
            }),
            flight: Singleflight::new(),
            picker,
            stats: GroupStats::default(),
        })
    }
}

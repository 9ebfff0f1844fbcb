//! HTTP peer pool: consistent-hash owner selection over a set of base URLs.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use hoard::peer::{Peer, PeerPicker};
use hoard_core::ring::{Crc32Hasher, Ring, RingHasher};

use crate::client::HttpPeer;

/// Default HTTP path prefix serving peer requests.
pub const DEFAULT_BASE_PATH: &str = "/_hoard/";

/// Default number of synthetic ring positions per peer.
pub const DEFAULT_REPLICAS: usize = 50;

type SharedHasher = Arc<dyn RingHasher + Send + Sync>;

/// Configuration for an [`HttpPool`].
pub struct HttpPoolOptions {
    /// HTTP path prefix serving peer requests, with leading and trailing
    /// slashes. Defaults to [`DEFAULT_BASE_PATH`].
    pub base_path: String,
    /// Synthetic ring positions per peer. Defaults to [`DEFAULT_REPLICAS`].
    pub replicas: usize,
    /// Ring placement hash. Defaults to [`Crc32Hasher`].
    pub hasher: SharedHasher,
}

impl Default for HttpPoolOptions {
    fn default() -> Self {
        HttpPoolOptions {
            base_path: DEFAULT_BASE_PATH.to_owned(),
            replicas: DEFAULT_REPLICAS,
            hasher: Arc::new(Crc32Hasher),
        }
    }
}

impl fmt::Debug for HttpPoolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPoolOptions")
            .field("base_path", &self.base_path)
            .field("replicas", &self.replicas)
            .finish()
    }
}

struct PoolState {
    ring: Ring<SharedHasher>,
    peers: HashMap<String, Arc<HttpPeer>>,
}

/// A pool of HTTP peers implementing [`PeerPicker`].
///
/// The ring and the per-peer clients are replaced wholesale by
/// [`set_peers`](HttpPool::set_peers) — each call starts a new membership
/// epoch; lookups in flight keep using the epoch they started with.
pub struct HttpPool {
    /// This process's advertised base URL, e.g. `http://10.0.0.2:8008`.
    self_url: String,
    options: HttpPoolOptions,
    client: reqwest::Client,
    state: Mutex<PoolState>,
}

impl HttpPool {
    /// Creates a pool with default options.
    ///
    /// `self_url` must be this process's own entry in the peer lists handed
    /// to [`set_peers`](HttpPool::set_peers), so the pool can recognize keys
    /// it owns itself.
    pub fn new(self_url: impl Into<String>) -> Arc<Self> {
        Self::with_options(self_url, HttpPoolOptions::default())
    }

    /// Creates a pool with explicit options.
    pub fn with_options(self_url: impl Into<String>, options: HttpPoolOptions) -> Arc<Self> {
        let ring = Ring::with_hasher(options.replicas, Arc::clone(&options.hasher));
        Arc::new(HttpPool {
            self_url: self_url.into(),
            options,
            client: reqwest::Client::new(),
            state: Mutex::new(PoolState {
                ring,
                peers: HashMap::new(),
            }),
        })
    }

    /// Replaces the peer set. Each entry is a base URL of the same shape as
    /// `self_url`; the list normally includes this process itself.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers.into_iter().map(Into::into).collect();
        let mut ring = Ring::with_hasher(self.options.replicas, Arc::clone(&self.options.hasher));
        ring.add(peers.iter().cloned());
        let clients = peers
            .iter()
            .map(|peer| {
                let base_url = format!("{}{}", peer, self.options.base_path);
                (
                    peer.clone(),
                    Arc::new(HttpPeer::new(self.client.clone(), base_url)),
                )
            })
            .collect();

        let mut state = self.lock();
        state.ring = ring;
        state.peers = clients;
        info!(peers = peers.len(), "peer set replaced");
    }

    /// The HTTP path prefix this pool's peers serve under.
    pub fn base_path(&self) -> &str {
        &self.options.base_path
    }

    /// This process's advertised base URL.
    pub fn self_url(&self) -> &str {
        &self.self_url
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for HttpPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPool")
            .field("self_url", &self.self_url)
            .field("options", &self.options)
            .finish()
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn Peer>> {
        let state = self.lock();
        let owner = state.ring.get(key)?;
        if owner == self.self_url {
            return None;
        }
        state
            .peers
            .get(owner)
            .map(|peer| Arc::clone(peer) as Arc<dyn Peer>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_owns_everything_locally() {
        let pool = HttpPool::new("http://self:8008");
        assert!(pool.pick_peer("k").is_none());
    }

    #[test]
    fn single_self_peer_owns_everything_locally() {
        let pool = HttpPool::new("http://self:8008");
        pool.set_peers(["http://self:8008"]);
        for i in 0..100 {
            assert!(pool.pick_peer(&format!("k{i}")).is_none());
        }
    }

    #[test]
    fn keys_split_between_self_and_remote() {
        let pool = HttpPool::new("http://self:8008");
        pool.set_peers(["http://self:8008", "http://other:8008"]);

        let remote = (0..200)
            .filter(|i| pool.pick_peer(&format!("k{i}")).is_some())
            .count();
        // Both owners take a meaningful share.
        assert!((20..=180).contains(&remote), "remote owned {remote}/200");
    }

    #[test]
    fn zero_replicas_mean_no_owners() {
        let pool = HttpPool::with_options(
            "http://self:8008",
            HttpPoolOptions {
                replicas: 0,
                ..HttpPoolOptions::default()
            },
        );
        pool.set_peers(["http://self:8008", "http://other:8008"]);
        assert!(pool.pick_peer("k").is_none());
    }

    #[test]
    fn membership_epochs_replace_the_ring() {
        let pool = HttpPool::new("http://self:8008");
        pool.set_peers(["http://self:8008", "http://other:8008"]);
        pool.set_peers(["http://self:8008"]);
        for i in 0..100 {
            assert!(pool.pick_peer(&format!("k{i}")).is_none());
        }
    }
}

//! Peer capabilities: owner selection and remote fetch.
//!
//! The transport behind a [`Peer`] is opaque to the core; `hoard-http`
//! provides the reference HTTP binding.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use hoard_core::Raw;

use crate::error::BoxError;

/// A handle to a remote peer able to serve `(group, key)` fetches.
///
/// Implementations must be safe for concurrent use by many callers.
#[async_trait]
pub trait Peer: Send + Sync {
    /// Fetches the value for `key` in the named group from this peer.
    async fn fetch(&self, group: &str, key: &str) -> Result<Raw, BoxError>;
}

/// Maps a key to its owner peer for the current membership epoch.
pub trait PeerPicker: Send + Sync {
    /// Returns the owner's handle, or `None` when this process is the owner
    /// (or no peers are known).
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn Peer>>;
}

/// The picker used when no peer pool is configured: every key is local.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPeers;

impl PeerPicker for NoPeers {
    fn pick_peer(&self, _key: &str) -> Option<Arc<dyn Peer>> {
        None
    }
}

static PEER_PICKER: OnceLock<Arc<dyn PeerPicker>> = OnceLock::new();

/// Installs the process-wide peer picker consulted by groups that were not
/// given an explicit one.
///
/// # Panics
///
/// Panics on a second call: installing two pickers is a startup programmer
/// error. Tests should inject pickers per group instead of using the global.
pub fn register_peer_picker(picker: Arc<dyn PeerPicker>) {
    if PEER_PICKER.set(picker).is_err() {
        panic!("hoard: peer picker already registered");
    }
}

/// The process-wide picker, if one has been registered.
pub(crate) fn global_peer_picker() -> Option<Arc<dyn PeerPicker>> {
    PEER_PICKER.get().cloned()
}

//! The process-global peer picker is settable exactly once. Kept in its own
//! test binary so the global never leaks into other tests.

use std::sync::Arc;

use hoard::{NoPeers, register_peer_picker};

#[test]
#[should_panic(expected = "peer picker already registered")]
fn second_global_picker_registration_panics() {
    register_peer_picker(Arc::new(NoPeers));
    register_peer_picker(Arc::new(NoPeers));
}

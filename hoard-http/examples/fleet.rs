//! A minimal cache peer.
//!
//! Start a few of these, each pointing at the full peer list, then ask any
//! of them for a key — only the owner's loader runs:
//!
//! ```text
//! SELF=http://127.0.0.1:4001 PEERS=http://127.0.0.1:4001,http://127.0.0.1:4002 \
//!     cargo run --example fleet
//! SELF=http://127.0.0.1:4002 PEERS=http://127.0.0.1:4001,http://127.0.0.1:4002 \
//!     cargo run --example fleet
//! curl http://127.0.0.1:4001/_hoard/words/cache
//! ```

use std::env;
use std::time::Duration;

use hoard::{BoxError, Group, LoaderFn, Raw, Registry};
use hoard_http::HttpPool;

/// Stands in for the expensive authoritative source.
async fn slow_definition(key: String) -> Result<Raw, BoxError> {
    tokio::time::sleep(Duration::from_millis(200)).await;
    let body = serde_json::json!({ "key": key, "length": key.len() });
    Ok(Raw::from(serde_json::to_vec(&body)?))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("info,hoard=debug,hoard_http=debug")
        .init();

    let self_url = env::var("SELF").unwrap_or_else(|_| "http://127.0.0.1:4001".to_owned());
    let peers = env::var("PEERS").unwrap_or_else(|_| self_url.clone());

    let pool = HttpPool::new(self_url.clone());
    pool.set_peers(peers.split(',').map(str::trim).map(String::from));
    hoard::register_peer_picker(pool.clone());

    Group::builder("words", 64 << 20, LoaderFn(slow_definition)).build();

    let bind = self_url
        .strip_prefix("http://")
        .unwrap_or(&self_url)
        .to_owned();
    let listener = tokio::net::TcpListener::bind(&bind).await.unwrap();
    tracing::info!(%self_url, "peer serving");
    let app = hoard_http::router(pool.base_path(), Registry::global());
    axum::serve(listener, app).await.unwrap();
}

//! HTTP peer binding for the hoard distributed cache.
//!
//! [`HttpPool`] implements [`hoard::PeerPicker`] over a consistent-hash ring
//! of peer base URLs; [`router`] exposes this process's groups to the other
//! peers; [`HttpPeer`] is the client half used to fetch from an owner.
//!
//! Wire contract: `GET <peer-base><base-path><group>/<key>` (both segments
//! URL-escaped) answered with `200` and a protobuf
//! [`GetResponse`](wire::GetResponse) body of content type
//! `application/x-protobuf`. Any non-2xx status is surfaced verbatim to the
//! caller as an error.
//!
//! ```no_run
//! use hoard::{BoxError, Group, LoaderFn, Raw, Registry};
//! use hoard_http::HttpPool;
//!
//! async fn lookup(key: String) -> Result<Raw, BoxError> {
//!     Ok(Raw::from(key))
//! }
//!
//! # async fn run() {
//! let pool = HttpPool::new("http://10.0.0.1:8008");
//! pool.set_peers([
//!     "http://10.0.0.1:8008",
//!     "http://10.0.0.2:8008",
//!     "http://10.0.0.3:8008",
//! ]);
//! hoard::register_peer_picker(pool.clone());
//!
//! Group::builder("users", 64 << 20, LoaderFn(lookup)).build();
//!
//! let app = hoard_http::router(pool.base_path(), Registry::global());
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8008").await.unwrap();
//! axum::serve(listener, app).await.unwrap();
//! # }
//! ```

pub mod client;
pub mod pool;
pub mod server;
pub mod wire;

pub use client::{HttpPeer, HttpPeerError};
pub use pool::{DEFAULT_BASE_PATH, DEFAULT_REPLICAS, HttpPool, HttpPoolOptions};
pub use server::router;

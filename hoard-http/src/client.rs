//! Client half of the HTTP binding: fetches values from owner peers.

use async_trait::async_trait;
use prost::Message;
use reqwest::StatusCode;
use url::Url;

use hoard::peer::Peer;
use hoard::{BoxError, Raw};

use crate::wire::GetResponse;

/// Errors from one peer fetch.
#[derive(Debug, thiserror::Error)]
pub enum HttpPeerError {
    /// The peer base URL or the composed request URL is invalid.
    #[error("invalid peer url {0:?}")]
    Url(String),
    /// The request could not be sent or the body could not be read.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// The peer answered with a non-success status.
    #[error("peer returned status {0}")]
    UnexpectedStatus(StatusCode),
    /// The response body was not a valid `GetResponse` message.
    #[error("decoding peer response: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// One remote peer, addressed by its base URL plus the pool's base path
/// (for example `http://10.0.0.2:8008/_hoard/`).
///
/// Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpPeer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPeer {
    /// Creates a peer handle reusing an existing HTTP client.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        HttpPeer {
            client,
            base_url: base_url.into(),
        }
    }

    /// The peer's base URL including the pool base path.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_url(&self, group: &str, key: &str) -> Result<Url, HttpPeerError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|_| HttpPeerError::Url(self.base_url.clone()))?;
        url.path_segments_mut()
            .map_err(|()| HttpPeerError::Url(self.base_url.clone()))?
            .pop_if_empty()
            .push(group)
            .push(key);
        Ok(url)
    }

    async fn get_value(&self, group: &str, key: &str) -> Result<Raw, HttpPeerError> {
        let url = self.request_url(group, key)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpPeerError::UnexpectedStatus(status));
        }
        // `Bytes` body straight into the decoder; nothing is copied.
        let body = response.bytes().await?;
        let message = GetResponse::decode(body)?;
        Ok(message.value)
    }
}

#[async_trait]
impl Peer for HttpPeer {
    async fn fetch(&self, group: &str, key: &str) -> Result<Raw, BoxError> {
        self.get_value(group, key).await.map_err(Into::into)
    }
}

//! HTTP transport for tile requests
//!
//! The fetcher only talks to [`TileClient`], so tests can swap the network
//! for an in-memory tile server.

use std::time::Duration;
use async_trait::async_trait;
use bytes::Bytes;
use log::trace;
use thiserror::Error;

use crate::errors::{MosaicError, MosaicResult};

/// Default `User-Agent` sent with tile requests
pub const DEFAULT_USER_AGENT: &str = concat!("tilemosaic/", env!("CARGO_PKG_VERSION"));

/// Status and body of one tile request
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
}

impl TileResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        TileResponse { status, body: body.into() }
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The server has no tile here: 404, or a 2xx with an empty body
    pub fn is_missing(&self) -> bool {
        self.status == 404 || (self.is_success() && self.body.is_empty())
    }
}

/// Why a single request attempt failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchAttemptError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("worker pool closed")]
    PoolClosed,
}

/// Performs a GET for one tile URL
#[async_trait]
pub trait TileClient: Send + Sync {
    /// Request `url` and return its status and full body
    async fn get(&self, url: &str) -> Result<TileResponse, FetchAttemptError>;
}

/// [`TileClient`] backed by `reqwest`
pub struct HttpTileClient {
    client: reqwest::Client,
}

impl HttpTileClient {
    /// Build a client with a per-request timeout and user agent
    pub fn new(timeout: Duration, user_agent: &str) -> MosaicResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| MosaicError::BackendUnavailable(format!("HTTP client: {}", e)))?;
        Ok(HttpTileClient { client })
    }
}

#[async_trait]
impl TileClient for HttpTileClient {
    async fn get(&self, url: &str) -> Result<TileResponse, FetchAttemptError> {
        trace!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchAttemptError::Request(format!("timeout: {}", e))
            } else {
                FetchAttemptError::Request(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await
            .map_err(|e| FetchAttemptError::Request(e.to_string()))?;
        Ok(TileResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_found_or_empty_success_is_missing() {
        assert!(TileResponse::new(404, "gone").is_missing());
        assert!(TileResponse::new(200, Vec::new()).is_missing());
        assert!(TileResponse::new(204, Vec::new()).is_missing());
        assert!(!TileResponse::new(200, "tile").is_missing());
        assert!(!TileResponse::new(500, Vec::new()).is_missing());
        assert!(!TileResponse::new(503, Vec::new()).is_missing());
    }
}

//! Upload pipeline delivering activity snapshots to the remote collector.
//!
//! Each publish is a single JSON `POST` to one statically configured
//! endpoint. The pipeline never retries; the driver owns the backoff policy.

use crate::core::ActivitySnapshot;
use std::time::Duration;
use thiserror::Error;

/// Collector endpoint configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Full URL snapshots are posted to
    pub endpoint_url: String,
    /// Upper bound on one request, connect included
    pub timeout: Duration,
}

impl UploadConfig {
    /// Create a new upload configuration.
    pub fn new(endpoint_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            timeout,
        }
    }
}

/// Upload error types.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Client could not be constructed
    #[error("upload config error: {0}")]
    Config(String),
    /// Connection, TLS or timeout failure
    #[error("transport failure: {0}")]
    Transport(String),
    /// Collector answered with a non-success status
    #[error("collector returned status {status}")]
    Status { status: u16 },
    /// Snapshot could not be encoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Delivery of one snapshot, one attempt.
///
/// Implemented by [`BlockingCollectorClient`] for production and by scripted
/// fakes in tests.
pub trait Publisher {
    fn publish(&self, snapshot: &ActivitySnapshot) -> Result<(), UploadError>;
}

/// Async client for the collector endpoint.
pub struct CollectorClient {
    config: UploadConfig,
    client: reqwest::Client,
}

impl CollectorClient {
    /// Create a new collector client.
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("activity-sampler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::Config(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Get the endpoint URL.
    pub fn endpoint_url(&self) -> &str {
        &self.config.endpoint_url
    }

    /// Post one snapshot. Only a 2xx status counts as delivered; the
    /// response body is ignored.
    pub async fn publish(&self, snapshot: &ActivitySnapshot) -> Result<(), UploadError> {
        let body =
            serde_json::to_vec(snapshot).map_err(|e| UploadError::Serialization(e.to_string()))?;

        let response = self
            .client
            .post(&self.config.endpoint_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
            });
        }

        Ok(())
    }

    /// Check whether the endpoint answers at all.
    ///
    /// Any HTTP response, whatever its status, counts as reachable. Returns
    /// the status code seen.
    pub async fn check_endpoint(&self) -> Result<u16, UploadError> {
        let response = self
            .client
            .head(&self.config.endpoint_url)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        Ok(response.status().as_u16())
    }
}

/// Blocking collector client for the synchronous driver loop.
pub struct BlockingCollectorClient {
    inner: CollectorClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingCollectorClient {
    /// Create a new blocking collector client.
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| UploadError::Config(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: CollectorClient::new(config)?,
            runtime,
        })
    }

    /// Get the endpoint URL.
    pub fn endpoint_url(&self) -> &str {
        self.inner.endpoint_url()
    }

    /// Check whether the endpoint answers at all.
    pub fn check_endpoint(&self) -> Result<u16, UploadError> {
        self.runtime.block_on(self.inner.check_endpoint())
    }
}

impl Publisher for BlockingCollectorClient {
    fn publish(&self, snapshot: &ActivitySnapshot) -> Result<(), UploadError> {
        self.runtime.block_on(self.inner.publish(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_display() {
        let err = UploadError::Status { status: 503 };
        assert_eq!(err.to_string(), "collector returned status 503");

        let err = UploadError::Transport("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_client_keeps_endpoint() {
        let config = UploadConfig::new("http://127.0.0.1:9/activity", Duration::from_secs(1));
        let client = BlockingCollectorClient::new(config).unwrap();
        assert_eq!(client.endpoint_url(), "http://127.0.0.1:9/activity");
    }
}

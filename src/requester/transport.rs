//! HTTP transport for the migration service
//!
//! `MigrationTransport` is the seam between the requester and the network.
//! `HttpTransport` is the `reqwest` implementation; `RetryInterceptor` wraps
//! any transport and resubmits the same request while the service answers
//! with a server error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use thiserror::Error;
use tracing::{debug, warn};

use crate::retry::MAX_RETRIES;

/// Connection-level failure; no HTTP status was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("HTTP transport error: {0}")]
pub struct TransportError(pub String);

/// Status and body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    /// `None` when the response carried no body
    pub body: Option<String>,
}

impl HttpReply {
    pub fn new(status: u16, body: Option<String>) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

#[async_trait]
pub trait MigrationTransport: Send + Sync + 'static {
    /// POST `url` with an empty body
    async fn post_empty(&self, url: &str) -> Result<HttpReply, TransportError>;
}

#[async_trait]
impl<T: MigrationTransport + ?Sized> MigrationTransport for Arc<T> {
    async fn post_empty(&self, url: &str) -> Result<HttpReply, TransportError> {
        (**self).post_empty(url).await
    }
}

/// `reqwest`-backed transport with a per-attempt timeout
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MigrationTransport for HttpTransport {
    async fn post_empty(&self, url: &str) -> Result<HttpReply, TransportError> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(CONTENT_LENGTH, 0u64)
            .body("")
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("Failed to read response body: {}", e)))?;
        let body = if body.is_empty() { None } else { Some(body) };
        Ok(HttpReply::new(status, body))
    }
}

/// Resubmits a request immediately while the reply is a server error
pub struct RetryInterceptor<T> {
    inner: T,
    max_attempts: u32,
}

impl<T: MigrationTransport> RetryInterceptor<T> {
    pub fn new(inner: T) -> Self {
        Self::with_max_attempts(inner, MAX_RETRIES)
    }

    pub fn with_max_attempts(inner: T, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
        }
    }
}

#[async_trait]
impl<T: MigrationTransport> MigrationTransport for RetryInterceptor<T> {
    async fn post_empty(&self, url: &str) -> Result<HttpReply, TransportError> {
        let mut reply = self.inner.post_empty(url).await?;
        for attempt in 2..=self.max_attempts {
            if !reply.is_server_error() {
                break;
            }
            warn!(
                "Migration service answered {}, retrying ({}/{})",
                reply.status, attempt, self.max_attempts
            );
            reply = self.inner.post_empty(url).await?;
        }
        Ok(reply)
    }
}

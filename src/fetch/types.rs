//! Core types for the page fetch capability

use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::worker::WorkerId;

/// One decoded catalog page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchedPage {
    /// Items of this page, in payload order
    pub items: Vec<Value>,
    /// Whether the endpoint reports further pages
    pub has_more: bool,
    /// Total item count when the endpoint reports one
    pub total: Option<u64>,
}

/// Failure of a single page fetch
///
/// Transport-level failures are retried by the worker. An unexpected status
/// or an undecodable payload is fatal for the page and skips the remaining
/// attempts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Navigation did not complete within the fetch timeout
    #[error("Navigation timeout after {0:?}")]
    Timeout(Duration),

    /// Navigation or connection failure
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The document answered with a status outside the allowed set
    #[error("Unexpected HTTP status {status} for {url}")]
    UnexpectedStatus { status: i64, url: String },

    /// The document was not a catalog payload
    #[error("Unexpected payload: {0}")]
    Payload(String),

    /// The browser session could not be created or reset
    #[error("Browser session error: {0}")]
    Session(String),
}

impl FetchError {
    /// Whether the same page is worth another attempt
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Navigation(_) | Self::Session(_) => true,
            Self::UnexpectedStatus { .. } | Self::Payload(_) => false,
        }
    }
}

/// A handle to one browser session able to fetch catalog pages
///
/// Each worker owns exactly one fetcher for its whole lifetime; fetchers
/// are never shared between workers.
pub trait PageFetcher: Send {
    /// Fetch and decode `url`, sending `referer`, within `timeout`
    fn fetch<'a>(
        &'a mut self,
        url: &'a str,
        referer: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<FetchedPage, FetchError>>;

    /// Drop session state (cookies) and install a fresh session
    fn reset_session(&mut self) -> BoxFuture<'_, Result<(), FetchError>>;

    /// Release the underlying browser
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Creates one [`PageFetcher`] per worker slot
pub trait FetcherFactory: Send + Sync + 'static {
    fn create(&self, worker: WorkerId) -> BoxFuture<'_, Result<Box<dyn PageFetcher>, FetchError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_payload_errors_are_fatal() {
        assert!(FetchError::Timeout(Duration::from_secs(3)).is_retryable());
        assert!(FetchError::Navigation("net::ERR_CONNECTION_RESET".into()).is_retryable());
        assert!(
            !FetchError::UnexpectedStatus {
                status: 403,
                url: "https://example.com".into()
            }
            .is_retryable()
        );
        assert!(!FetchError::Payload("missing data".into()).is_retryable());
    }
}

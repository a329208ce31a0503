//! Core configuration types for the scan service

use serde::{Deserialize, Serialize};

/// Upstream proxy each browser session connects through
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// `host:port`, optionally with a scheme
    pub address: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Page visited once per browser at launch to confirm the proxy answers
    pub check_url: Option<String>,
}

impl ProxyConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: None,
            password: None,
            check_url: None,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_check_url(mut self, url: impl Into<String>) -> Self {
        self.check_url = Some(url.into());
        self
    }
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("check_url", &self.check_url)
            .finish()
    }
}

/// Main configuration of the scan service
///
/// Durations are kept in milliseconds so the struct serializes the same way
/// the environment spells it; the getters hand out `Duration`s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub(crate) workers: usize,
    pub(crate) server_host: String,
    pub(crate) server_port: u16,
    pub(crate) server_timeout_ms: u64,
    pub(crate) proxy: Option<ProxyConfig>,
    pub(crate) referer: String,
    pub(crate) fetch_timeout_ms: u64,
    pub(crate) max_fetch_attempts: u32,
    pub(crate) page_delay_jitter_ms: u64,
    pub(crate) headless: bool,
    pub(crate) locale: String,

    /// Pending requests older than this are failed; `None` disables expiry
    pub(crate) request_ttl_ms: Option<u64>,

    /// Relaunch crashed worker slots once the pool is running
    pub(crate) respawn_workers: bool,

    /// Consecutive given-up pages after which a batch slice fails; `None`
    /// keeps skipping forward until the catalog reports no more pages
    pub(crate) max_skipped_pages: Option<u32>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::builder().into_config()
    }
}

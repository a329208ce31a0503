//! Fluent builder for `ServiceConfig`
//!
//! Every field has a default, so `build()` is always reachable; it
//! validates the combination instead.

use std::time::Duration;

use super::errors::ConfigError;
use super::types::{ProxyConfig, ServiceConfig};
use crate::utils::{
    DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_LOCALE, DEFAULT_PAGE_DELAY_JITTER_MS, DEFAULT_REFERER,
    DEFAULT_SERVER_TIMEOUT_MS, DEFAULT_WORKERS, MAX_RETRIES,
};

pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl Default for ServiceConfigBuilder {
    fn default() -> Self {
        Self {
            config: ServiceConfig {
                workers: DEFAULT_WORKERS,
                server_host: DEFAULT_SERVER_HOST.to_string(),
                server_port: DEFAULT_SERVER_PORT,
                server_timeout_ms: DEFAULT_SERVER_TIMEOUT_MS,
                proxy: None,
                referer: DEFAULT_REFERER.to_string(),
                fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
                max_fetch_attempts: MAX_RETRIES,
                page_delay_jitter_ms: DEFAULT_PAGE_DELAY_JITTER_MS,
                headless: true,
                locale: DEFAULT_LOCALE.to_string(),
                request_ttl_ms: None,
                respawn_workers: false,
                max_skipped_pages: None,
            },
        }
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }
}

impl ServiceConfigBuilder {
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    #[must_use]
    pub fn server_host(mut self, host: impl Into<String>) -> Self {
        self.config.server_host = host.into();
        self
    }

    #[must_use]
    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server_port = port;
        self
    }

    /// Deadline for a single-page request once it leaves the admission queue
    #[must_use]
    pub fn server_timeout(mut self, timeout: Duration) -> Self {
        self.config.server_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.config.proxy = proxy;
        self
    }

    #[must_use]
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.config.referer = referer.into();
        self
    }

    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn max_fetch_attempts(mut self, attempts: u32) -> Self {
        self.config.max_fetch_attempts = attempts;
        self
    }

    #[must_use]
    pub fn page_delay_jitter(mut self, jitter: Duration) -> Self {
        self.config.page_delay_jitter_ms = jitter.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.config.locale = locale.into();
        self
    }

    #[must_use]
    pub fn request_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.config.request_ttl_ms = ttl.map(|ttl| ttl.as_millis() as u64);
        self
    }

    #[must_use]
    pub fn respawn_workers(mut self, respawn: bool) -> Self {
        self.config.respawn_workers = respawn;
        self
    }

    #[must_use]
    pub fn max_skipped_pages(mut self, limit: Option<u32>) -> Self {
        self.config.max_skipped_pages = limit;
        self
    }

    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let config = self.config;

        if config.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if config.max_fetch_attempts == 0 {
            return Err(ConfigError::ZeroFetchAttempts);
        }
        if config.fetch_timeout_ms == 0 {
            return Err(ConfigError::ZeroFetchTimeout);
        }
        if config.max_skipped_pages == Some(0) {
            return Err(ConfigError::ZeroSkippedPages);
        }
        if config.server_host.trim().is_empty() {
            return Err(ConfigError::EmptyServerHost);
        }
        if let Some(proxy) = &config.proxy
            && proxy.password.is_some()
            && proxy.username.is_none()
        {
            return Err(ConfigError::ProxyPasswordWithoutUser);
        }

        Ok(config)
    }

    /// Defaults without validation; only used for `Default`
    pub(crate) fn into_config(self) -> ServiceConfig {
        self.config
    }
}

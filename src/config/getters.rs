//! Getter methods for `ServiceConfig`

use std::time::Duration;

use super::types::{ProxyConfig, ServiceConfig};

impl ServiceConfig {
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn server_host(&self) -> &str {
        &self.server_host
    }

    #[must_use]
    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    /// `host:port` the front door binds to
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    #[must_use]
    pub fn server_timeout(&self) -> Duration {
        Duration::from_millis(self.server_timeout_ms)
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    #[must_use]
    pub fn referer(&self) -> &str {
        &self.referer
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    #[must_use]
    pub fn max_fetch_attempts(&self) -> u32 {
        self.max_fetch_attempts
    }

    #[must_use]
    pub fn page_delay_jitter(&self) -> Duration {
        Duration::from_millis(self.page_delay_jitter_ms)
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    #[must_use]
    pub fn request_ttl(&self) -> Option<Duration> {
        self.request_ttl_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn respawn_workers(&self) -> bool {
        self.respawn_workers
    }

    #[must_use]
    pub fn max_skipped_pages(&self) -> Option<u32> {
        self.max_skipped_pages
    }
}

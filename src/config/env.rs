//! Loading `ServiceConfig` from environment variables
//!
//! Unset or empty variables keep their default; a value that does not
//! parse is an error rather than a silent fallback.

use std::str::FromStr;
use std::time::Duration;

use super::builder::ServiceConfigBuilder;
use super::errors::ConfigError;
use super::types::{ProxyConfig, ServiceConfig};

impl ServiceConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut builder = ServiceConfigBuilder::default();

        if let Some(workers) = parse::<usize>(&var, "WORKERS")? {
            builder = builder.workers(workers);
        }
        if let Some(host) = var("SERVER_HOST") {
            builder = builder.server_host(host);
        }
        if let Some(port) = parse::<u16>(&var, "SERVER_PORT")? {
            builder = builder.server_port(port);
        }
        if let Some(ms) = parse::<u64>(&var, "SERVER_TIMEOUT")? {
            builder = builder.server_timeout(Duration::from_millis(ms));
        }
        if let Some(address) = var("PROXY_ADDRESS") {
            let mut proxy = ProxyConfig::new(address);
            proxy.username = var("PROXY_USER");
            proxy.password = var("PROXY_PASS");
            proxy.check_url = var("PROXY_CHECK_URL");
            builder = builder.proxy(Some(proxy));
        }
        if let Some(referer) = var("SCAN_REFERER") {
            builder = builder.referer(referer);
        }
        if let Some(ms) = parse::<u64>(&var, "FETCH_TIMEOUT")? {
            builder = builder.fetch_timeout(Duration::from_millis(ms));
        }
        if let Some(attempts) = parse::<u32>(&var, "MAX_FETCH_ATTEMPTS")? {
            builder = builder.max_fetch_attempts(attempts);
        }
        if let Some(ms) = parse::<u64>(&var, "PAGE_DELAY_JITTER")? {
            builder = builder.page_delay_jitter(Duration::from_millis(ms));
        }
        if let Some(headless) = parse_flag(&var, "HEADLESS")? {
            builder = builder.headless(headless);
        }
        if let Some(locale) = var("BROWSER_LOCALE") {
            builder = builder.locale(locale);
        }
        if let Some(ms) = parse::<u64>(&var, "REQUEST_TTL")? {
            builder = builder.request_ttl(Some(Duration::from_millis(ms)));
        }
        if let Some(respawn) = parse_flag(&var, "RESPAWN_WORKERS")? {
            builder = builder.respawn_workers(respawn);
        }
        if let Some(limit) = parse::<u32>(&var, "MAX_SKIPPED_PAGES")? {
            builder = builder.max_skipped_pages(Some(limit));
        }

        builder.build()
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|value| {
            value.parse::<T>().map_err(|e| ConfigError::Invalid {
                var: name,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_flag(var: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<bool>, ConfigError> {
    var(name)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                var: name,
                value,
                reason: "expected a boolean".to_string(),
            }),
        })
        .transpose()
}

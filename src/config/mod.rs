//! Service configuration
//!
//! `ServiceConfig` with a validating builder and an environment loader.

pub mod builder;
pub mod env;
pub mod errors;
pub mod getters;
pub mod types;

pub use builder::ServiceConfigBuilder;
pub use errors::ConfigError;
pub use types::{ProxyConfig, ServiceConfig};

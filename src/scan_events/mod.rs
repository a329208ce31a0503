//! Scan event bus
//!
//! The supervisor announces readiness, terminal request results and worker
//! exits here; front-door handlers subscribe per request id.

pub mod bus;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod streaming;
pub mod types;

pub use bus::ScanEventBus;
pub use config::EventBusConfig;
pub use errors::EventBusError;
pub use metrics::{EventBusMetrics, MetricsSnapshot};
pub use streaming::FilteredReceiver;
pub use types::{ScanEvent, ScanOutcome, ShutdownReason, WorkerFailure};

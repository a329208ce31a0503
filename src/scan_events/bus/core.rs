//! Core ScanEventBus struct definition and constructors

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Notify, broadcast};

use crate::scan_events::config::EventBusConfig;
use crate::scan_events::metrics::EventBusMetrics;
use crate::scan_events::types::ScanEvent;

/// Broadcast bus carrying supervisor events to every waiting caller
///
/// Shared behind an `Arc` by the supervisor and the front door.
#[derive(Debug)]
pub struct ScanEventBus {
    pub(super) sender: broadcast::Sender<ScanEvent>,
    pub(super) config: EventBusConfig,
    pub(super) metrics: EventBusMetrics,
    pub(super) shutdown: Arc<Notify>,
    pub(super) shutdown_flag: AtomicBool,
}

impl ScanEventBus {
    /// Create a new event bus with the specified capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_config(EventBusConfig {
            capacity,
            ..Default::default()
        })
    }

    #[must_use]
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.capacity);
        Self {
            sender,
            config,
            metrics: EventBusMetrics::new(),
            shutdown: Arc::new(Notify::new()),
            shutdown_flag: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &EventBusMetrics {
        &self.metrics
    }

    /// Events buffered for the slowest subscriber
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.sender.len()
    }
}

impl Default for ScanEventBus {
    fn default() -> Self {
        Self::with_config(EventBusConfig::default())
    }
}

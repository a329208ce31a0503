//! Configuration for the scan event bus

use crate::utils::constants::EVENT_BUS_CAPACITY;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Maximum number of events buffered per subscriber before it lags
    pub capacity: usize,
    /// Whether to collect publish counters
    pub enable_metrics: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: EVENT_BUS_CAPACITY,
            enable_metrics: true,
        }
    }
}

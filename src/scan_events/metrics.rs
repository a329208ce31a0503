use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

use super::types::ScanEvent;

/// Lock-free counters for bus traffic
///
/// Terminal events are also counted per kind so `/status` can report how
/// requests have been ending.
#[derive(Debug, Clone, Default)]
pub struct EventBusMetrics {
    pub events_published: Arc<AtomicU64>,
    pub events_dropped: Arc<AtomicU64>,
    pub requests_finished: Arc<AtomicU64>,
    pub requests_partial: Arc<AtomicU64>,
    pub requests_failed: Arc<AtomicU64>,
    pub peak_subscribers: Arc<AtomicUsize>,
}

impl EventBusMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-kind counter for terminal events
    #[must_use]
    pub fn terminal_counter(&self, event: &ScanEvent) -> Option<&AtomicU64> {
        match event {
            ScanEvent::Finished { .. } => Some(&*self.requests_finished),
            ScanEvent::Partial { .. } => Some(&*self.requests_partial),
            ScanEvent::Failed { .. } => Some(&*self.requests_failed),
            _ => None,
        }
    }

    pub fn record_published(&self, terminal: Option<&AtomicU64>, subscribers: usize) {
        self.events_published.fetch_add(1, Ordering::SeqCst);
        let _ = self.peak_subscribers.fetch_max(subscribers, Ordering::SeqCst);
        if let Some(counter) = terminal {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Published with nobody listening
    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_published: self.events_published.load(Ordering::SeqCst),
            events_dropped: self.events_dropped.load(Ordering::SeqCst),
            requests_finished: self.requests_finished.load(Ordering::SeqCst),
            requests_partial: self.requests_partial.load(Ordering::SeqCst),
            requests_failed: self.requests_failed.load(Ordering::SeqCst),
            peak_subscribers: self.peak_subscribers.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub events_published: u64,
    pub events_dropped: u64,
    pub requests_finished: u64,
    pub requests_partial: u64,
    pub requests_failed: u64,
    pub peak_subscribers: usize,
}

impl MetricsSnapshot {
    /// Requests that reached a terminal event
    #[must_use]
    pub fn terminal_requests(&self) -> u64 {
        self.requests_finished + self.requests_partial + self.requests_failed
    }
}

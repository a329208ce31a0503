//! Shutdown operations for the ScanEventBus

use std::sync::atomic::Ordering;

use crate::scan_events::types::{ScanEvent, ShutdownReason};

use super::core::ScanEventBus;

impl ScanEventBus {
    /// Publish a `Shutdown` event and wake every `wait_for_shutdown` caller
    ///
    /// Idempotent: only the first call publishes.
    pub fn shutdown(&self, reason: ShutdownReason) {
        if self.shutdown_flag.swap(true, Ordering::SeqCst) {
            return;
        }

        log::info!("Event bus shutting down: {reason:?}");
        let _ = self.publish(ScanEvent::shutdown(reason));
        self.shutdown.notify_waiters();
    }

    /// Wait for the shutdown signal
    ///
    /// Returns immediately if shutdown already happened.
    pub async fn wait_for_shutdown(&self) {
        let notified = self.shutdown.notified();
        if self.is_shutdown() {
            return;
        }
        notified.await;
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }
}

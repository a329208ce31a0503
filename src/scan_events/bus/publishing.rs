//! Publishing operations for the ScanEventBus

use crate::scan_events::errors::EventBusError;
use crate::scan_events::types::ScanEvent;

use super::core::ScanEventBus;

impl ScanEventBus {
    /// Publish an event to all subscribers
    ///
    /// Never blocks; slow subscribers lag instead. Called from inside the
    /// supervisor's state transitions, so it must stay synchronous.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of active subscribers that received the event
    /// * `Err(EventBusError::NoSubscribers)` - Nobody was listening
    pub fn publish(&self, event: ScanEvent) -> Result<usize, EventBusError> {
        let terminal = self.metrics.terminal_counter(&event);

        match self.sender.send(event) {
            Ok(subscribers) => {
                if self.config.enable_metrics {
                    self.metrics.record_published(terminal, subscribers);
                }
                Ok(subscribers)
            }
            Err(_) => {
                if self.config.enable_metrics {
                    self.metrics.record_dropped();
                }
                log::debug!("Published event but no active subscribers");
                Err(EventBusError::NoSubscribers)
            }
        }
    }
}

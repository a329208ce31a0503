//! Subscription operations for the ScanEventBus

use tokio::sync::broadcast;

use crate::scan_events::streaming::FilteredReceiver;
use crate::scan_events::types::ScanEvent;

use super::core::ScanEventBus;

impl ScanEventBus {
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Create a filtered subscriber that only receives matching events
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&ScanEvent) -> bool + Send + Sync + 'static,
    {
        FilteredReceiver::new(self.subscribe(), filter)
    }

    /// Subscribe to the terminal event of one request
    ///
    /// Subscribe before dispatching, or a fast request can finish unseen.
    pub fn subscribe_request(
        &self,
        request_id: String,
    ) -> FilteredReceiver<impl Fn(&ScanEvent) -> bool + Send + Sync + 'static + use<>> {
        self.subscribe_filtered(move |event| event.request_id() == Some(request_id.as_str()))
    }
}

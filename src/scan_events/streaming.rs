//! Filtered receivers
//!
//! Callers waiting on one request subscribe with a filter on its request id
//! and then wait for the terminal event.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::errors::EventBusError;
use super::types::{ScanEvent, ScanOutcome};

/// Filtered event receiver wrapper
pub struct FilteredReceiver<F>
where
    F: Fn(&ScanEvent) -> bool + Send + Sync + 'static,
{
    receiver: broadcast::Receiver<ScanEvent>,
    filter: Arc<F>,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&ScanEvent) -> bool + Send + Sync + 'static,
{
    pub fn new(receiver: broadcast::Receiver<ScanEvent>, filter: F) -> Self {
        Self {
            receiver,
            filter: Arc::new(filter),
        }
    }

    /// Receive the next event that passes the filter
    ///
    /// `Shutdown` events always pass so waiters are never stranded.
    pub async fn recv(&mut self) -> Result<ScanEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if matches!(event, ScanEvent::Shutdown { .. }) || (self.filter)(&event) {
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(EventBusError::Shutdown);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Err(EventBusError::ReceiverLagged(skipped));
                }
            }
        }
    }

    /// Try to receive the next filtered event without blocking
    pub fn try_recv(&mut self) -> Result<Option<ScanEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if matches!(event, ScanEvent::Shutdown { .. }) || (self.filter)(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::Shutdown);
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    return Err(EventBusError::ReceiverLagged(skipped));
                }
            }
        }
    }

    /// Wait for the terminal outcome of the filtered request
    ///
    /// Lag is logged and the wait continues.
    pub async fn recv_outcome(&mut self) -> Result<ScanOutcome, EventBusError> {
        loop {
            match self.recv().await {
                Ok(ScanEvent::Shutdown { .. }) => return Err(EventBusError::Shutdown),
                Ok(event) => {
                    if let Some(outcome) = event.into_outcome() {
                        return Ok(outcome);
                    }
                }
                Err(EventBusError::ReceiverLagged(skipped)) => {
                    log::warn!("Outcome receiver lagged, skipped {skipped} events");
                }
                Err(e) => return Err(e),
            }
        }
    }

    #[must_use]
    pub fn would_receive(&self, event: &ScanEvent) -> bool {
        (self.filter)(event)
    }
}

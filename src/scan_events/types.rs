//! Event types published by the supervisor
//!
//! Every dispatched request ends in exactly one terminal event
//! (`Finished`, `Partial` or `Failed`) unless it is cancelled.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::worker::{RequestId, WorkerId};

/// Reason for event bus shutdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShutdownReason {
    /// The service is stopping
    ServiceStopped,
    Error(String),
}

/// A participant of a batch request that ended with `scan_error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerFailure {
    pub worker: WorkerId,
    pub reason: String,
}

/// Events emitted by the supervisor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Every pool slot reported ready; emitted once
    ServiceStarted {
        workers: usize,
        timestamp: DateTime<Utc>,
    },
    /// All participants finished; `items` is the aggregated result
    Finished {
        request_id: RequestId,
        items: Arc<Vec<Value>>,
        timestamp: DateTime<Utc>,
    },
    /// Some participants finished, some errored
    Partial {
        request_id: RequestId,
        items: Arc<Vec<Value>>,
        failed_workers: Vec<WorkerFailure>,
        timestamp: DateTime<Utc>,
    },
    /// Every participant errored, or the request expired
    Failed {
        request_id: RequestId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// A worker task ended outside of shutdown
    WorkerExited {
        worker: WorkerId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// The bus is shutting down; subscribers should stop waiting
    Shutdown {
        reason: ShutdownReason,
        timestamp: DateTime<Utc>,
    },
}

/// Terminal result of one request, as seen by a caller
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Finished {
        items: Arc<Vec<Value>>,
    },
    Partial {
        items: Arc<Vec<Value>>,
        failed_workers: Vec<WorkerFailure>,
    },
    Failed {
        reason: String,
    },
}

impl ScanEvent {
    pub fn service_started(workers: usize) -> Self {
        Self::ServiceStarted {
            workers,
            timestamp: Utc::now(),
        }
    }

    pub fn finished(request_id: RequestId, items: Vec<Value>) -> Self {
        Self::Finished {
            request_id,
            items: Arc::new(items),
            timestamp: Utc::now(),
        }
    }

    pub fn partial(request_id: RequestId, items: Vec<Value>, failed_workers: Vec<WorkerFailure>) -> Self {
        Self::Partial {
            request_id,
            items: Arc::new(items),
            failed_workers,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(request_id: RequestId, reason: impl Into<String>) -> Self {
        Self::Failed {
            request_id,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn worker_exited(worker: WorkerId, reason: impl Into<String>) -> Self {
        Self::WorkerExited {
            worker,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn shutdown(reason: ShutdownReason) -> Self {
        Self::Shutdown {
            reason,
            timestamp: Utc::now(),
        }
    }

    /// The request this event terminates, if any
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Finished { request_id, .. }
            | Self::Partial { request_id, .. }
            | Self::Failed { request_id, .. } => Some(request_id),
            _ => None,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ServiceStarted { timestamp, .. }
            | Self::Finished { timestamp, .. }
            | Self::Partial { timestamp, .. }
            | Self::Failed { timestamp, .. }
            | Self::WorkerExited { timestamp, .. }
            | Self::Shutdown { timestamp, .. } => *timestamp,
        }
    }

    /// Convert a terminal event into the caller-facing outcome
    #[must_use]
    pub fn into_outcome(self) -> Option<ScanOutcome> {
        match self {
            Self::Finished { items, .. } => Some(ScanOutcome::Finished { items }),
            Self::Partial {
                items,
                failed_workers,
                ..
            } => Some(ScanOutcome::Partial {
                items,
                failed_workers,
            }),
            Self::Failed { reason, .. } => Some(ScanOutcome::Failed { reason }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_terminal_events_carry_a_request_id() {
        assert_eq!(
            ScanEvent::finished("req-1".into(), vec![]).request_id(),
            Some("req-1")
        );
        assert_eq!(
            ScanEvent::failed("req-2".into(), "boom").request_id(),
            Some("req-2")
        );
        assert_eq!(ScanEvent::service_started(2).request_id(), None);
        assert_eq!(
            ScanEvent::shutdown(ShutdownReason::ServiceStopped).request_id(),
            None
        );
    }

    #[test]
    fn partial_event_converts_into_partial_outcome() {
        let failure = WorkerFailure {
            worker: WorkerId(1),
            reason: "timeout".into(),
        };
        let outcome = ScanEvent::partial("req".into(), vec![json!({"id": 1})], vec![failure.clone()])
            .into_outcome();

        match outcome {
            Some(ScanOutcome::Partial {
                items,
                failed_workers,
            }) => {
                assert_eq!(items.len(), 1);
                assert_eq!(failed_workers, vec![failure]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(ScanEvent::service_started(1).into_outcome().is_none());
    }
}

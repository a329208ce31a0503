//! Request correlator
//!
//! Maps request ids to their participating workers and counts the terminal
//! reports still outstanding. The table lives inside the supervisor's pool
//! lock, so decrement-and-test-for-zero is atomic with respect to every
//! other state transition and completion is observed exactly once.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::scan_events::WorkerFailure;
use crate::worker::{RequestId, WorkerId};

/// How one participant's task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Finished,
    Failed(String),
}

/// Fan-in bookkeeping for one dispatched request
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub participants: BTreeSet<WorkerId>,
    reported: BTreeSet<WorkerId>,
    outstanding: usize,
    failures: Vec<WorkerFailure>,
    opened_at: Instant,
}

impl PendingRequest {
    fn new(request_id: RequestId, participants: BTreeSet<WorkerId>, opened_at: Instant) -> Self {
        Self {
            request_id,
            outstanding: participants.len(),
            participants,
            reported: BTreeSet::new(),
            failures: Vec::new(),
            opened_at,
        }
    }

    /// Terminal reports still expected
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.opened_at)
    }
}

/// How a completed request resolves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every participant finished
    Finished,
    /// At least one finished and at least one failed
    Partial(Vec<WorkerFailure>),
    /// Every participant failed; carries the last reason received
    Failed(String),
}

/// A request whose outstanding count just reached zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRequest {
    pub request_id: RequestId,
    pub participants: BTreeSet<WorkerId>,
    pub resolution: Resolution,
}

/// Result of recording one terminal report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordResult {
    /// No pending request with that id (never opened, cancelled, or expired)
    Unknown,
    /// Sender is not a participant, or already reported
    Ignored,
    Pending { outstanding: usize },
    Complete(CompletedRequest),
}

#[derive(Debug, Default)]
pub struct RequestCorrelator {
    pending: HashMap<RequestId, PendingRequest>,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `request_id`
    ///
    /// Returns `false`, leaving the table untouched, if the id is already
    /// pending or there are no participants.
    pub fn open(&mut self, request_id: RequestId, participants: BTreeSet<WorkerId>) -> bool {
        self.open_at(request_id, participants, Instant::now())
    }

    pub fn open_at(
        &mut self,
        request_id: RequestId,
        participants: BTreeSet<WorkerId>,
        now: Instant,
    ) -> bool {
        if participants.is_empty() || self.pending.contains_key(&request_id) {
            return false;
        }
        self.pending.insert(
            request_id.clone(),
            PendingRequest::new(request_id, participants, now),
        );
        true
    }

    /// Record one participant's terminal report
    pub fn record(&mut self, request_id: &str, worker: WorkerId, outcome: TaskOutcome) -> RecordResult {
        let Some(pending) = self.pending.get_mut(request_id) else {
            return RecordResult::Unknown;
        };

        if !pending.participants.contains(&worker) || !pending.reported.insert(worker) {
            debug!(request_id, worker = %worker, "Ignoring report from non-participant or duplicate");
            return RecordResult::Ignored;
        }

        pending.outstanding -= 1;
        if let TaskOutcome::Failed(reason) = outcome {
            pending.failures.push(WorkerFailure { worker, reason });
        }

        if pending.outstanding > 0 {
            return RecordResult::Pending {
                outstanding: pending.outstanding,
            };
        }

        let Some(done) = self.pending.remove(request_id) else {
            return RecordResult::Unknown;
        };

        let resolution = if done.failures.is_empty() {
            Resolution::Finished
        } else if done.failures.len() == done.participants.len() {
            Resolution::Failed(
                done.failures
                    .last()
                    .map(|f| f.reason.clone())
                    .unwrap_or_default(),
            )
        } else {
            Resolution::Partial(done.failures)
        };

        RecordResult::Complete(CompletedRequest {
            request_id: done.request_id,
            participants: done.participants,
            resolution,
        })
    }

    /// Stop tracking `request_id` without resolving it
    pub fn cancel(&mut self, request_id: &str) -> Option<PendingRequest> {
        self.pending.remove(request_id)
    }

    /// Remove and return every request older than `ttl`
    pub fn take_expired(&mut self, now: Instant, ttl: Duration) -> Vec<PendingRequest> {
        let expired: Vec<RequestId> = self
            .pending
            .values()
            .filter(|p| p.age(now) >= ttl)
            .map(|p| p.request_id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|id| self.pending.remove(id))
            .collect()
    }

    #[must_use]
    pub fn get(&self, request_id: &str) -> Option<&PendingRequest> {
        self.pending.get(request_id)
    }

    #[must_use]
    pub fn contains(&self, request_id: &str) -> bool {
        self.pending.contains_key(request_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

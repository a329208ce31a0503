//! Pool bookkeeping guarded by the supervisor's single mutex

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::AbortHandle;
use tracing::warn;

use super::correlator::RequestCorrelator;
use super::partition::plan_batch;
use crate::pagination::PaginationError;
use crate::worker::{RequestId, WorkerCommand, WorkerId};

/// Point-in-time view of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub pool_size: usize,
    pub operational: usize,
    pub idle: usize,
    pub busy: usize,
    pub pending_requests: usize,
}

#[derive(Debug)]
pub(crate) struct WorkerSlot {
    pub commands: mpsc::Sender<WorkerCommand>,
    pub abort: AbortHandle,
    /// Set once the worker reported `Started`
    pub operational: bool,
}

/// Idle/busy sets, live slots and the pending-request table
///
/// An operational worker is in exactly one of `idle` and `busy`.
#[derive(Debug, Default)]
pub(crate) struct PoolState {
    pub slots: BTreeMap<WorkerId, WorkerSlot>,
    pub idle: BTreeSet<WorkerId>,
    pub busy: BTreeSet<WorkerId>,
    pub correlator: RequestCorrelator,
    pub service_started: bool,
}

impl PoolState {
    /// Mark a slot operational and idle; false for unknown or repeated reports
    pub fn mark_ready(&mut self, worker: WorkerId) -> bool {
        match self.slots.get_mut(&worker) {
            Some(slot) if !slot.operational => {
                slot.operational = true;
                self.busy.remove(&worker);
                self.idle.insert(worker);
                true
            }
            _ => false,
        }
    }

    pub fn assign(&mut self, worker: WorkerId) {
        self.idle.remove(&worker);
        self.busy.insert(worker);
    }

    /// Move a busy worker back to idle
    pub fn release(&mut self, worker: WorkerId) -> bool {
        if self.busy.remove(&worker) && self.slots.contains_key(&worker) {
            self.idle.insert(worker);
            return true;
        }
        false
    }

    pub fn remove_slot(&mut self, worker: WorkerId) -> Option<WorkerSlot> {
        self.idle.remove(&worker);
        self.busy.remove(&worker);
        self.slots.remove(&worker)
    }

    pub fn send(
        &self,
        worker: WorkerId,
        command: WorkerCommand,
    ) -> Result<(), TrySendError<WorkerCommand>> {
        match self.slots.get(&worker) {
            Some(slot) => slot.commands.try_send(command),
            None => Err(TrySendError::Closed(command)),
        }
    }

    /// Hand one interleaved slice of a batch to every idle worker that can
    /// take it, and mark those workers busy
    ///
    /// Channel capacity is reserved before the batch is planned, so the
    /// stride equals the number of slices actually delivered.
    pub fn dispatch_batch(
        &mut self,
        url: &str,
        request_id: &RequestId,
    ) -> Result<BTreeSet<WorkerId>, PaginationError> {
        let mut participants = BTreeSet::new();
        {
            let mut permits = Vec::with_capacity(self.idle.len());
            for worker in &self.idle {
                let Some(slot) = self.slots.get(worker) else {
                    continue;
                };
                match slot.commands.try_reserve() {
                    Ok(permit) => permits.push((*worker, permit)),
                    Err(e) => {
                        warn!(request_id = %request_id, worker = %worker, error = %e, "Worker cannot take a batch slice");
                    }
                }
            }
            if permits.is_empty() {
                return Ok(participants);
            }

            let tasks = plan_batch(url, request_id, permits.len())?;
            for ((worker, permit), task) in permits.into_iter().zip(tasks) {
                permit.send(WorkerCommand::Scan(task));
                participants.insert(worker);
            }
        }

        for worker in &participants {
            self.assign(*worker);
        }
        Ok(participants)
    }

    pub fn first_idle(&self) -> Option<WorkerId> {
        self.idle.iter().next().copied()
    }

    pub fn operational(&self) -> usize {
        self.slots.values().filter(|slot| slot.operational).count()
    }

    pub fn stats(&self, pool_size: usize) -> PoolStats {
        PoolStats {
            pool_size,
            operational: self.operational(),
            idle: self.idle.len(),
            busy: self.busy.len(),
            pending_requests: self.correlator.len(),
        }
    }
}

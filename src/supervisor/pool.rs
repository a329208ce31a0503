//! The supervisor
//!
//! Owns the worker slots, dispatches scan tasks, correlates terminal
//! reports and publishes request results on the event bus. Caller
//! operations and worker reports both funnel through one mutex-guarded
//! [`PoolState`]; the lock is only held for a state transition, never
//! across an await.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::correlator::{CompletedRequest, RecordResult, Resolution, TaskOutcome};
use super::errors::SupervisorError;
use super::partition::plan_single;
use super::state::{PoolState, PoolStats, WorkerSlot};
use crate::config::ServiceConfig;
use crate::fetch::FetcherFactory;
use crate::pagination::{PaginationError, extract_pagination_state};
use crate::scan_events::{ScanEvent, ScanEventBus, ShutdownReason};
use crate::store::ResultStore;
use crate::utils::constants::{
    MIN_EXPIRY_SWEEP_INTERVAL_MS, REPORT_CHANNEL_CAPACITY, WORKER_SHUTDOWN_GRACE_MS,
};
use crate::worker::{WorkerCommand, WorkerId, WorkerReport, WorkerSettings, spawn_worker};

/// Reason attached to requests dropped by the expiry sweep
pub const REQUEST_EXPIRED: &str = "request expired";

/// Pool-level settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub pool_size: usize,
    pub worker: WorkerSettings,
    /// Pending requests older than this fail with "request expired"
    pub request_ttl: Option<Duration>,
    /// Relaunch a slot whose worker exited after the pool started
    pub respawn_workers: bool,
    pub shutdown_grace: Duration,
}

impl SupervisorSettings {
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            worker: WorkerSettings::default(),
            request_ttl: None,
            respawn_workers: false,
            shutdown_grace: Duration::from_millis(WORKER_SHUTDOWN_GRACE_MS),
        }
    }
}

impl From<&ServiceConfig> for SupervisorSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            pool_size: config.workers(),
            worker: WorkerSettings::from(config),
            request_ttl: config.request_ttl(),
            respawn_workers: config.respawn_workers(),
            shutdown_grace: Duration::from_millis(WORKER_SHUTDOWN_GRACE_MS),
        }
    }
}

/// Startup progress, observed by [`Supervisor::wait_until_started`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolPhase {
    Starting,
    Running,
    Failed(String),
    Stopped,
}

pub struct Supervisor {
    settings: SupervisorSettings,
    worker_settings: Arc<WorkerSettings>,
    state: Mutex<PoolState>,
    factory: Arc<dyn FetcherFactory>,
    store: Arc<dyn ResultStore>,
    events: Arc<ScanEventBus>,
    reports: mpsc::Sender<WorkerReport>,
    idle: Arc<Notify>,
    phase: watch::Sender<PoolPhase>,
    monitors: Mutex<Vec<JoinHandle<()>>>,
    background: Mutex<Vec<JoinHandle<()>>>,
    shutting_down: AtomicBool,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("settings", &self.settings)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Spawn every worker slot and the report loop
    ///
    /// Returns immediately; use [`Supervisor::wait_until_started`] to wait
    /// for the pool to become ready.
    pub fn start(
        settings: SupervisorSettings,
        factory: Arc<dyn FetcherFactory>,
        store: Arc<dyn ResultStore>,
        events: Arc<ScanEventBus>,
    ) -> Result<Arc<Self>, SupervisorError> {
        if settings.pool_size == 0 {
            return Err(SupervisorError::EmptyPool);
        }

        let (reports, inbox) = mpsc::channel(REPORT_CHANNEL_CAPACITY);
        let (phase, _) = watch::channel(PoolPhase::Starting);

        let supervisor = Arc::new(Self {
            worker_settings: Arc::new(settings.worker.clone()),
            settings,
            state: Mutex::new(PoolState::default()),
            factory,
            store,
            events,
            reports,
            idle: Arc::new(Notify::new()),
            phase,
            monitors: Mutex::new(Vec::new()),
            background: Mutex::new(Vec::new()),
            shutting_down: AtomicBool::new(false),
        });

        for n in 0..supervisor.settings.pool_size {
            supervisor.spawn_slot(WorkerId(n as u32));
        }

        let mut background = supervisor.background.lock();
        background.push(tokio::spawn(Arc::clone(&supervisor).run_reports(inbox)));
        if let Some(ttl) = supervisor.settings.request_ttl {
            background.push(tokio::spawn(Arc::clone(&supervisor).run_expiry(ttl)));
        }
        drop(background);

        info!(workers = supervisor.settings.pool_size, "Supervisor started");
        Ok(supervisor)
    }

    // =========================================================================
    // Caller operations
    // =========================================================================

    /// Dispatch a one-page scan to one idle worker
    ///
    /// Returns `false` without side effects when no worker is idle, the
    /// request id is already pending, or the pool is shutting down.
    pub fn scan_single_page(&self, url: &str, request_id: &str) -> bool {
        if self.is_shutting_down() {
            warn!(request_id, "Single-page scan rejected: shutting down");
            return false;
        }

        let mut state = self.state.lock();
        if state.correlator.contains(request_id) {
            warn!(request_id, "Single-page scan rejected: request id already pending");
            return false;
        }
        let Some(worker) = state.first_idle() else {
            warn!(request_id, "Single-page scan dropped: no idle worker");
            return false;
        };

        let task = plan_single(url, &request_id.to_string());
        if let Err(e) = state.send(worker, WorkerCommand::Scan(task)) {
            error!(request_id, worker = %worker, error = %e, "Failed to dispatch scan");
            return false;
        }

        state.assign(worker);
        state
            .correlator
            .open(request_id.to_string(), BTreeSet::from([worker]));

        info!(request_id, worker = %worker, "Single-page scan dispatched");
        true
    }

    /// Fan a paginated scan out over every idle worker
    ///
    /// Returns the number of workers the request was dispatched to; zero
    /// means nothing happened. Fails only for a URL without a usable
    /// pagination state.
    pub fn scan_all_pages(&self, url: &str, request_id: &str) -> Result<usize, PaginationError> {
        extract_pagination_state(url)?;

        if self.is_shutting_down() {
            warn!(request_id, "Batch scan rejected: shutting down");
            return Ok(0);
        }

        let mut state = self.state.lock();
        if state.correlator.contains(request_id) {
            warn!(request_id, "Batch scan rejected: request id already pending");
            return Ok(0);
        }

        if state.idle.is_empty() {
            warn!(request_id, "Batch scan dropped: no idle worker");
            return Ok(0);
        }

        let participants = state.dispatch_batch(url, &request_id.to_string())?;
        let dispatched = participants.len();
        if dispatched > 0 {
            state.correlator.open(request_id.to_string(), participants);
        }

        info!(request_id, workers = dispatched, "Batch scan dispatched");
        Ok(dispatched)
    }

    /// Abandon a pending request
    ///
    /// Busy participants are sent `Cancel` and counted idle at once. No
    /// terminal event is published. Returns `false` for an unknown id.
    pub fn cancel_request(&self, request_id: &str) -> bool {
        let cancelled = {
            let mut state = self.state.lock();
            let Some(pending) = state.correlator.cancel(request_id) else {
                info!(request_id, "Cancel ignored: unknown request");
                return false;
            };
            Self::recall_participants(&mut state, request_id, &pending.participants)
        };

        info!(request_id, workers = ?cancelled, "Request cancelled");
        self.idle.notify_one();
        self.discard_results(request_id.to_string());
        true
    }

    /// True iff at least one worker is idle
    pub fn is_available(&self) -> bool {
        !self.is_shutting_down() && !self.state.lock().idle.is_empty()
    }

    /// Workers that reported ready and have not exited
    pub fn operational_workers(&self) -> usize {
        self.state.lock().operational()
    }

    pub fn stats(&self) -> PoolStats {
        self.state.lock().stats(self.settings.pool_size)
    }

    pub fn events(&self) -> &Arc<ScanEventBus> {
        &self.events
    }

    /// Notified whenever a worker returns to idle
    pub fn idle_notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.idle)
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Wait until every slot reported ready
    pub async fn wait_until_started(&self, timeout: Duration) -> Result<(), SupervisorError> {
        let mut phase = self.phase.subscribe();
        let waited = tokio::time::timeout(
            timeout,
            phase.wait_for(|phase| *phase != PoolPhase::Starting),
        )
        .await;

        match waited {
            Err(_) => Err(SupervisorError::StartupTimeout(timeout)),
            Ok(Err(_)) => Err(SupervisorError::ShutDown),
            Ok(Ok(phase)) => match &*phase {
                PoolPhase::Running => Ok(()),
                PoolPhase::Failed(reason) => Err(SupervisorError::StartupFailed(reason.clone())),
                PoolPhase::Starting | PoolPhase::Stopped => Err(SupervisorError::ShutDown),
            },
        }
    }

    /// Stop every worker and release the store; idempotent
    ///
    /// Workers get a grace period to close their browsers, then any still
    /// running are aborted.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Supervisor shutting down");

        let slots = {
            let mut state = self.state.lock();
            state.idle.clear();
            state.busy.clear();
            std::mem::take(&mut state.slots)
        };

        for (worker, slot) in &slots {
            if let Err(e) = slot.commands.try_send(WorkerCommand::Shutdown) {
                debug!(worker = %worker, error = %e, "Shutdown command not delivered");
            }
        }

        let monitors = std::mem::take(&mut *self.monitors.lock());
        if tokio::time::timeout(self.settings.shutdown_grace, futures::future::join_all(monitors))
            .await
            .is_err()
        {
            warn!(
                grace_ms = self.settings.shutdown_grace.as_millis() as u64,
                "Workers still running after grace period, aborting"
            );
        }
        for slot in slots.values() {
            slot.abort.abort();
        }

        for task in self.background.lock().drain(..) {
            task.abort();
        }

        if let Err(e) = self.store.close().await {
            warn!(error = %e, "Failed to close result store");
        }

        self.phase.send_replace(PoolPhase::Stopped);
        self.events.shutdown(ShutdownReason::ServiceStopped);
        info!("Supervisor shut down");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Worker slots
    // =========================================================================

    fn spawn_slot(&self, worker: WorkerId) {
        let mut state = self.state.lock();

        // Registered under the lock so the Started report can't outrun it
        let handle = spawn_worker(
            worker,
            Arc::clone(&self.factory),
            Arc::clone(&self.store),
            Arc::clone(&self.worker_settings),
            self.reports.clone(),
        );
        state.slots.insert(
            worker,
            WorkerSlot {
                commands: handle.commands,
                abort: handle.task.abort_handle(),
                operational: false,
            },
        );
        drop(state);

        let task = handle.task;
        let reports = self.reports.clone();
        let monitor = tokio::spawn(async move {
            let reason = match task.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(e) if e.is_cancelled() => Some("worker task aborted".to_string()),
                Err(e) => Some(format!("worker task panicked: {e}")),
            };
            let _ = reports.send(WorkerReport::Exited { worker, reason }).await;
        });
        self.monitors.lock().push(monitor);
    }

    /// Send `Cancel` to every still-busy participant and count it idle
    fn recall_participants(
        state: &mut PoolState,
        request_id: &str,
        participants: &BTreeSet<WorkerId>,
    ) -> Vec<WorkerId> {
        let mut recalled = Vec::new();
        for &worker in participants {
            if !state.busy.contains(&worker) {
                continue;
            }
            if let Err(e) = state.send(worker, WorkerCommand::Cancel) {
                warn!(request_id, worker = %worker, error = %e, "Cancel not delivered");
            }
            state.release(worker);
            recalled.push(worker);
        }
        recalled
    }

    fn discard_results(&self, request_id: String) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.delete(&request_id).await {
                warn!(request_id, error = %e, "Failed to delete stored results");
            }
        });
    }

    // =========================================================================
    // Report handling
    // =========================================================================

    async fn run_reports(self: Arc<Self>, mut inbox: mpsc::Receiver<WorkerReport>) {
        while let Some(report) = inbox.recv().await {
            self.handle_report(report);
        }
        debug!("Report channel closed");
    }

    fn handle_report(self: &Arc<Self>, report: WorkerReport) {
        match report {
            WorkerReport::Started { worker } => self.on_started(worker),
            WorkerReport::ScanFinished { request_id, worker } => {
                self.on_terminal(&request_id, worker, TaskOutcome::Finished);
            }
            WorkerReport::ScanError {
                request_id,
                worker,
                reason,
            } => {
                warn!(request_id, worker = %worker, reason, "Worker reported scan error");
                self.on_terminal(&request_id, worker, TaskOutcome::Failed(reason));
            }
            WorkerReport::Exited { worker, reason } => self.on_exited(worker, reason),
        }
    }

    fn on_started(&self, worker: WorkerId) {
        let (operational, first_full) = {
            let mut state = self.state.lock();
            if !state.mark_ready(worker) {
                debug!(worker = %worker, "Ignoring Started from unknown or ready worker");
                return;
            }
            let operational = state.operational();
            let first_full = !state.service_started && operational == self.settings.pool_size;
            if first_full {
                state.service_started = true;
            }
            (operational, first_full)
        };

        info!(worker = %worker, operational, "Worker operational");
        self.idle.notify_one();

        if first_full {
            self.phase.send_replace(PoolPhase::Running);
            let _ = self
                .events
                .publish(ScanEvent::service_started(self.settings.pool_size));
            info!(workers = operational, "All workers ready, service started");
        }
    }

    fn on_terminal(self: &Arc<Self>, request_id: &str, worker: WorkerId, outcome: TaskOutcome) {
        let completed = {
            let mut state = self.state.lock();
            match state.correlator.record(request_id, worker, outcome) {
                RecordResult::Unknown => {
                    debug!(request_id, worker = %worker, "Report for unknown request (cancelled or expired)");
                    None
                }
                RecordResult::Ignored => None,
                RecordResult::Pending { outstanding } => {
                    debug!(request_id, worker = %worker, outstanding, "Waiting for remaining workers");
                    None
                }
                RecordResult::Complete(done) => {
                    for &participant in &done.participants {
                        state.release(participant);
                    }
                    Some(done)
                }
            }
        };

        if let Some(done) = completed {
            self.idle.notify_one();
            let this = Arc::clone(self);
            tokio::spawn(async move { this.deliver(done).await });
        }
    }

    /// Read back, publish and delete the results of a completed request
    async fn deliver(&self, done: CompletedRequest) {
        let CompletedRequest {
            request_id,
            resolution,
            ..
        } = done;

        let event = match resolution {
            Resolution::Failed(reason) => ScanEvent::failed(request_id.clone(), reason),
            Resolution::Finished => match self.store.read_all(&request_id).await {
                Ok(items) => ScanEvent::finished(request_id.clone(), items),
                Err(e) => {
                    error!(request_id, error = %e, "Failed to read results, request not resolved");
                    return;
                }
            },
            Resolution::Partial(failures) => match self.store.read_all(&request_id).await {
                Ok(items) => {
                    warn!(request_id, failed = failures.len(), "Request partially failed");
                    ScanEvent::partial(request_id.clone(), items, failures)
                }
                Err(e) => {
                    error!(request_id, error = %e, "Failed to read results, request not resolved");
                    return;
                }
            },
        };

        match self.events.publish(event) {
            Ok(subscribers) => debug!(request_id, subscribers, "Request resolved"),
            Err(_) => debug!(request_id, "Request resolved with no listener"),
        }

        if let Err(e) = self.store.delete(&request_id).await {
            warn!(request_id, error = %e, "Failed to delete stored results");
        }
    }

    fn on_exited(&self, worker: WorkerId, reason: Option<String>) {
        if self.is_shutting_down() {
            debug!(worker = %worker, "Worker exited during shutdown");
            return;
        }

        let reason = reason.unwrap_or_else(|| "worker stopped unexpectedly".to_string());
        error!(worker = %worker, reason, "Worker exited");

        let started = {
            let mut state = self.state.lock();
            state.remove_slot(worker);
            state.service_started
        };
        let _ = self
            .events
            .publish(ScanEvent::worker_exited(worker, reason.clone()));

        if !started {
            // The pool can no longer reach full strength
            self.phase
                .send_replace(PoolPhase::Failed(format!("{worker}: {reason}")));
            return;
        }

        if self.settings.respawn_workers {
            warn!(worker = %worker, "Respawning worker slot");
            self.spawn_slot(worker);
        }
    }

    // =========================================================================
    // Request expiry
    // =========================================================================

    async fn run_expiry(self: Arc<Self>, ttl: Duration) {
        let period = (ttl / 4).max(Duration::from_millis(MIN_EXPIRY_SWEEP_INTERVAL_MS));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.expire_requests(Instant::now(), ttl);
        }
    }

    /// Fail every pending request older than `ttl`; returns how many expired
    pub fn expire_requests(&self, now: Instant, ttl: Duration) -> usize {
        let expired = {
            let mut state = self.state.lock();
            let expired = state.correlator.take_expired(now, ttl);
            for pending in &expired {
                Self::recall_participants(&mut state, &pending.request_id, &pending.participants);
            }
            expired
        };

        if expired.is_empty() {
            return 0;
        }

        for pending in &expired {
            warn!(
                request_id = %pending.request_id,
                outstanding = pending.outstanding(),
                "Request expired"
            );
            let _ = self
                .events
                .publish(ScanEvent::failed(pending.request_id.clone(), REQUEST_EXPIRED));
            self.discard_results(pending.request_id.clone());
        }
        self.idle.notify_one();
        expired.len()
    }
}

//! The worker task
//!
//! A worker owns one [`PageFetcher`] for its whole life and executes one
//! scan task at a time. Commands arrive on a private channel; every
//! dispatched task produces exactly one terminal report unless it is
//! cancelled.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::types::{
    ScanTask, WorkerCommand, WorkerError, WorkerId, WorkerReport, WorkerSettings, WorkerState,
};
use crate::fetch::{FetcherFactory, PageFetcher};
use crate::pagination::{apply_pagination_state, extract_pagination_state};
use crate::store::ResultStore;
use crate::utils::constants::WORKER_CHANNEL_CAPACITY;

/// How a task ended, from the worker's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskEnd {
    /// A terminal report was sent
    Reported,
    Cancelled,
    Shutdown,
}

/// Supervisor-side handle to a spawned worker
#[derive(Debug)]
pub struct WorkerHandle {
    pub id: WorkerId,
    pub commands: mpsc::Sender<WorkerCommand>,
    pub task: JoinHandle<Result<(), WorkerError>>,
}

/// Spawn a worker task on the current runtime
pub fn spawn_worker(
    id: WorkerId,
    factory: Arc<dyn FetcherFactory>,
    store: Arc<dyn ResultStore>,
    settings: Arc<WorkerSettings>,
    reports: mpsc::Sender<WorkerReport>,
) -> WorkerHandle {
    let (commands, inbox) = mpsc::channel(WORKER_CHANNEL_CAPACITY);
    let task = tokio::spawn(run_worker(id, factory, store, settings, inbox, reports));
    WorkerHandle { id, commands, task }
}

/// Full worker lifecycle: open a session, announce readiness, serve commands
pub async fn run_worker(
    id: WorkerId,
    factory: Arc<dyn FetcherFactory>,
    store: Arc<dyn ResultStore>,
    settings: Arc<WorkerSettings>,
    commands: mpsc::Receiver<WorkerCommand>,
    reports: mpsc::Sender<WorkerReport>,
) -> Result<(), WorkerError> {
    let mut fetcher = factory.create(id).await.map_err(WorkerError::Init)?;
    if let Err(e) = fetcher.reset_session().await {
        fetcher.close().await;
        return Err(WorkerError::Init(e));
    }

    let mut worker = Worker {
        id,
        fetcher,
        store,
        settings,
        commands,
        reports,
        backlog: VecDeque::new(),
        state: WorkerState::Created,
    };

    worker.state = WorkerState::Ready;
    let result = match worker.report(WorkerReport::Started { worker: id }).await {
        Ok(()) => {
            info!(worker = %id, "Worker ready");
            worker.serve().await
        }
        Err(e) => Err(e),
    };

    worker.state = WorkerState::Terminating;
    worker.fetcher.close().await;
    worker.state = WorkerState::Terminated;
    debug!(worker = %id, state = ?worker.state, "Worker stopped");

    result
}

struct Worker {
    id: WorkerId,
    fetcher: Box<dyn PageFetcher>,
    store: Arc<dyn ResultStore>,
    settings: Arc<WorkerSettings>,
    commands: mpsc::Receiver<WorkerCommand>,
    reports: mpsc::Sender<WorkerReport>,
    /// Scans that arrived while another task was running
    backlog: VecDeque<ScanTask>,
    state: WorkerState,
}

impl Worker {
    async fn serve(&mut self) -> Result<(), WorkerError> {
        loop {
            let command = match self.backlog.pop_front() {
                Some(task) => WorkerCommand::Scan(task),
                None => match self.commands.recv().await {
                    Some(command) => command,
                    None => {
                        debug!(worker = %self.id, "Command channel closed");
                        return Ok(());
                    }
                },
            };

            match command {
                WorkerCommand::Scan(task) => {
                    self.state = WorkerState::Scanning;
                    let end = self.scan(&task).await?;
                    self.state = WorkerState::Ready;
                    if end == TaskEnd::Shutdown {
                        return Ok(());
                    }
                }
                WorkerCommand::Cancel => {
                    debug!(worker = %self.id, "Cancel while idle");
                    self.refresh_session().await;
                }
                WorkerCommand::Shutdown => return Ok(()),
            }
        }
    }

    async fn scan(&mut self, task: &ScanTask) -> Result<TaskEnd, WorkerError> {
        let request_id = task.request_id.as_str();
        let mut url = task.url.clone();

        // Single-page URLs are fetched as given; batch tasks must be able to advance
        let mut position = if task.batch_mode {
            match extract_pagination_state(&task.url) {
                Ok(state) => Some(state),
                Err(e) => return self.fail(task, e.to_string()).await,
            }
        } else {
            None
        };

        let mut attempts = 0u32;
        let mut skipped = 0u32;

        info!(worker = %self.id, request_id, step = task.step, batch = task.batch_mode, "Scan started");

        loop {
            if let Some(end) = self.interrupted(request_id).await {
                return Ok(end);
            }

            let outcome = self
                .fetcher
                .fetch(&url, &self.settings.referer, self.settings.fetch_timeout)
                .await;

            // A cancelled task must never append
            if let Some(end) = self.interrupted(request_id).await {
                return Ok(end);
            }

            match outcome {
                Ok(page) => {
                    attempts = 0;
                    skipped = 0;
                    debug!(
                        worker = %self.id,
                        request_id,
                        url = %url,
                        items = page.items.len(),
                        has_more = page.has_more,
                        "Page fetched"
                    );

                    if !page.items.is_empty() {
                        if let Err(e) = self.store.append(request_id, page.items).await {
                            error!(worker = %self.id, request_id, error = %e, "Failed to persist page");
                            return self.fail(task, format!("result store append failed: {e}")).await;
                        }

                        // The supervisor's delete may have run before this append landed
                        if let Some(end) = self.interrupted(request_id).await {
                            if end == TaskEnd::Cancelled {
                                self.discard(request_id).await;
                            }
                            return Ok(end);
                        }
                    }

                    if !(page.has_more && task.batch_mode) {
                        return self.finish(task).await;
                    }
                }
                Err(e) => {
                    attempts += 1;

                    if e.is_retryable() && attempts < self.settings.max_attempts {
                        warn!(worker = %self.id, request_id, url = %url, attempt = attempts, error = %e, "Fetch failed, retrying page");
                        self.pause_between_pages().await;
                        self.refresh_session().await;
                        continue;
                    }

                    if !task.batch_mode {
                        error!(worker = %self.id, request_id, url = %url, attempt = attempts, error = %e, "Fetch failed, giving up");
                        return self.fail(task, e.to_string()).await;
                    }

                    skipped += 1;
                    error!(worker = %self.id, request_id, url = %url, attempt = attempts, error = %e, "Page given up, skipping forward");
                    if let Some(limit) = self.settings.max_skipped_pages
                        && skipped >= limit
                    {
                        return self
                            .fail(task, format!("{skipped} consecutive pages failed, last error: {e}"))
                            .await;
                    }
                    attempts = 0;
                }
            }

            if let Some(state) = position.as_mut() {
                if let Err(e) = state.advance(task.step) {
                    info!(worker = %self.id, request_id, error = %e, "Cursor range exhausted, slice finished");
                    return self.finish(task).await;
                }
                url = match apply_pagination_state(&url, state) {
                    Ok(next) => next,
                    Err(e) => return self.fail(task, e.to_string()).await,
                };
            }

            self.pause_between_pages().await;
            self.refresh_session().await;
        }
    }

    /// Drain pending commands between fetch attempts
    async fn interrupted(&mut self, request_id: &str) -> Option<TaskEnd> {
        loop {
            match self.commands.try_recv() {
                Ok(WorkerCommand::Cancel) => {
                    info!(worker = %self.id, request_id, "Scan cancelled");
                    self.refresh_session().await;
                    return Some(TaskEnd::Cancelled);
                }
                Ok(WorkerCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                    return Some(TaskEnd::Shutdown);
                }
                Ok(WorkerCommand::Scan(next)) => {
                    warn!(worker = %self.id, request_id, queued = %next.request_id, "Scan received while busy, queued");
                    self.backlog.push_back(next);
                }
                Err(TryRecvError::Empty) => return None,
            }
        }
    }

    async fn finish(&mut self, task: &ScanTask) -> Result<TaskEnd, WorkerError> {
        self.report(WorkerReport::ScanFinished {
            request_id: task.request_id.clone(),
            worker: self.id,
        })
        .await?;
        info!(worker = %self.id, request_id = %task.request_id, "Scan finished");
        Ok(TaskEnd::Reported)
    }

    async fn fail(&mut self, task: &ScanTask, reason: String) -> Result<TaskEnd, WorkerError> {
        self.report(WorkerReport::ScanError {
            request_id: task.request_id.clone(),
            worker: self.id,
            reason,
        })
        .await?;
        Ok(TaskEnd::Reported)
    }

    async fn report(&mut self, report: WorkerReport) -> Result<(), WorkerError> {
        self.reports
            .send(report)
            .await
            .map_err(|_| WorkerError::ReportChannelClosed)
    }

    async fn discard(&mut self, request_id: &str) {
        if let Err(e) = self.store.delete(request_id).await {
            warn!(worker = %self.id, request_id, error = %e, "Failed to discard cancelled results");
        }
    }

    async fn refresh_session(&mut self) {
        if let Err(e) = self.fetcher.reset_session().await {
            warn!(worker = %self.id, error = %e, "Failed to reset browser session");
        }
    }

    async fn pause_between_pages(&mut self) {
        let max_ms = u64::try_from(self.settings.page_delay_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return;
        }
        let delay = rand::rng().random_range(0..max_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

//! Worker identity, tasks and the supervisor <-> worker message protocol

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::fetch::FetchError;
use crate::utils::constants::{
    DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_PAGE_DELAY_JITTER_MS, DEFAULT_REFERER, MAX_RETRIES,
};

/// Caller-chosen identifier correlating a scan with its terminal event
pub type RequestId = String;

/// Stable logical name of a pool slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub u32);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Lifecycle of a worker task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Created,
    Ready,
    Scanning,
    Terminating,
    Terminated,
}

/// One dispatched unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTask {
    pub url: String,
    pub request_id: RequestId,
    /// Page stride between successive fetches; 1 for single-page scans
    pub step: u64,
    pub batch_mode: bool,
}

/// Supervisor -> worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    Scan(ScanTask),
    /// Drop the in-flight task without reporting and start a fresh session
    Cancel,
    Shutdown,
}

/// Worker -> supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerReport {
    Started {
        worker: WorkerId,
    },
    ScanFinished {
        request_id: RequestId,
        worker: WorkerId,
    },
    ScanError {
        request_id: RequestId,
        worker: WorkerId,
        reason: String,
    },
    /// The worker task ended; `reason` is `None` for an orderly shutdown
    Exited {
        worker: WorkerId,
        reason: Option<String>,
    },
}

/// Per-worker fetch policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub referer: String,
    pub fetch_timeout: Duration,
    /// Attempts per page before the page is given up
    pub max_attempts: u32,
    /// Upper bound of the random pause between pages of one task
    pub page_delay_jitter: Duration,
    /// Consecutive given-up pages after which a batch task ends with an
    /// error; `None` skips forward without limit
    pub max_skipped_pages: Option<u32>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            referer: DEFAULT_REFERER.to_string(),
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            max_attempts: MAX_RETRIES,
            page_delay_jitter: Duration::from_millis(DEFAULT_PAGE_DELAY_JITTER_MS),
            max_skipped_pages: None,
        }
    }
}

impl From<&ServiceConfig> for WorkerSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            referer: config.referer().to_string(),
            fetch_timeout: config.fetch_timeout(),
            max_attempts: config.max_fetch_attempts(),
            page_delay_jitter: config.page_delay_jitter(),
            max_skipped_pages: config.max_skipped_pages(),
        }
    }
}

/// Why a worker task ended abnormally
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("browser session could not be started: {0}")]
    Init(#[source] FetchError),

    #[error("supervisor report channel closed")]
    ReportChannelClosed,
}

//! Scan workers
//!
//! Each worker runs as its own tokio task with a private browser session
//! and talks to the supervisor only through channels.

pub mod runner;
pub mod types;

pub use runner::{WorkerHandle, run_worker, spawn_worker};
pub use types::{
    RequestId, ScanTask, WorkerCommand, WorkerError, WorkerId, WorkerReport, WorkerSettings,
    WorkerState,
};

//! Worker pool supervisor
//!
//! Dispatches single-page and batch scans, tracks idle/busy workers, fans
//! terminal reports back in per request and publishes the result.

pub mod correlator;
pub mod errors;
pub mod partition;
pub mod pool;
mod state;

pub use correlator::{
    CompletedRequest, PendingRequest, RecordResult, RequestCorrelator, Resolution, TaskOutcome,
};
pub use errors::SupervisorError;
pub use partition::{plan_batch, plan_single};
pub use pool::{PoolPhase, REQUEST_EXPIRED, Supervisor, SupervisorSettings};
pub use state::PoolStats;

//! Admission control for single-page scans
//!
//! Bounds concurrently executing jobs to the capacity the worker pool
//! reports and queues the rest in FIFO order.

pub mod errors;
pub mod queue;

pub use errors::AdmissionError;
pub use queue::{AdmissionQueue, CapacitySource};

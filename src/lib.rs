//! Paginated catalog scanning over a pool of browser workers
//!
//! A [`Supervisor`] owns a fixed pool of workers, each driving its own
//! browser session. Batch scans fan one paginated listing out over every
//! idle worker with interleaved pages; single-page scans take one worker
//! through the [`AdmissionQueue`]. Results are collected in a
//! [`ResultStore`] and published on the [`ScanEventBus`] once every
//! participating worker has reported.

pub mod admission;
pub mod browser_profile;
pub mod browser_setup;
pub mod config;
pub mod fetch;
pub mod http;
pub mod pagination;
pub mod scan_events;
pub mod store;
pub mod supervisor;
pub mod utils;
pub mod worker;

pub use admission::{AdmissionError, AdmissionQueue, CapacitySource};
pub use browser_setup::{BrowserLaunchOptions, ProxyAuth, find_browser_executable, launch_browser};
pub use config::{ConfigError, ProxyConfig, ServiceConfig};
pub use fetch::{ChromiumFetcherFactory, FetchError, FetchedPage, FetcherFactory, PageFetcher};
pub use pagination::{
    PaginationError, PaginationState, ScanParameters, apply_pagination_state,
    extract_pagination_state, extract_scan_parameters, replace_scan_parameters,
};
pub use scan_events::{ScanEvent, ScanEventBus, ScanOutcome, WorkerFailure};
pub use store::{MemoryStore, ResultStore, StoreError};
pub use supervisor::{PoolStats, Supervisor, SupervisorError, SupervisorSettings};
pub use worker::{RequestId, WorkerId, WorkerSettings};

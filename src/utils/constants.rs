//! Shared configuration constants for catalog_scan
//!
//! Default values used by the config layer, the workers and the browser
//! launcher, kept in one place to avoid magic numbers.

/// Attempts per page before a fetch failure is escalated
///
/// A single-page scan reports `scan_error` after this many failed attempts.
/// A batch scan skips forward to its next page instead.
pub const MAX_RETRIES: u32 = 3;

/// Default worker pool size
pub const DEFAULT_WORKERS: usize = 4;

/// Default per-navigation timeout: 3 seconds
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 3_000;

/// Default single-page request timeout at the front door: 30 seconds
pub const DEFAULT_SERVER_TIMEOUT_MS: u64 = 30_000;

/// Deadline for the proxy check page visited at browser launch
pub const PROXY_CHECK_TIMEOUT_SECS: u64 = 10;

/// Upper bound of the random pause between two pages of the same task
pub const DEFAULT_PAGE_DELAY_JITTER_MS: u64 = 500;

/// Grace period granted to workers on shutdown before their tasks are aborted
pub const WORKER_SHUTDOWN_GRACE_MS: u64 = 2_000;

/// How long the binary waits for every worker to report ready
pub const STARTUP_TIMEOUT_SECS: u64 = 120;

/// Shortest interval between two expiry sweeps of pending requests
pub const MIN_EXPIRY_SWEEP_INTERVAL_MS: u64 = 100;

/// Capacity of each worker's command channel
pub const WORKER_CHANNEL_CAPACITY: usize = 16;

/// Capacity of the shared worker report channel
pub const REPORT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the scan event bus
pub const EVENT_BUS_CAPACITY: usize = 1024;

/// Referer sent with every catalog page navigation
pub const DEFAULT_REFERER: &str =
    "https://search.shopping.naver.com/ns/search?query=iphone&includedDeliveryFee=true&score=4.8%7C5";

/// Browser locale used for every session
pub const DEFAULT_LOCALE: &str = "ko-KR";

/// HTTP statuses accepted for a catalog document
///
/// 407 shows up on the first navigation through an authenticating proxy and
/// still carries the payload.
pub const ALLOWED_STATUSES: [i64; 2] = [200, 407];

/// Chrome user agent string
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

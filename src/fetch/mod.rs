//! Page fetch capability
//!
//! Workers fetch catalog pages through the [`PageFetcher`] trait. The
//! production implementation drives a private Chromium per worker; tests
//! substitute scripted fetchers.

pub mod browser;
pub mod payload;
pub mod session;
pub mod types;

pub use browser::{ChromiumFetcher, ChromiumFetcherFactory};
pub use payload::decode_page;
pub use types::{FetchError, FetchedPage, FetcherFactory, PageFetcher};

//! HTTP front door
//!
//! Axum routes over the supervisor: batch scans, admission-queued
//! single-page scans, health and pool status.

pub mod errors;
pub mod handlers;
pub mod routes;
pub mod server;

pub use errors::ApiError;
pub use handlers::{AppState, PageQueue, PageResult};
pub use routes::create_router;
pub use server::HttpServer;

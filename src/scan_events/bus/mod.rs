//! Event bus implementation for publishing and subscribing to scan events

mod core;
mod publishing;
mod shutdown;
mod subscription;

pub use core::ScanEventBus;

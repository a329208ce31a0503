//! Result store capability
//!
//! An append-only list of items per request id. Workers append pages as
//! they arrive; the supervisor reads the whole list back once every
//! participant has reported, then deletes it.

pub mod memory;

use futures::future::BoxFuture;
use serde_json::Value;

pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store was closed or its backend is unreachable
    #[error("Result store unavailable: {0}")]
    Unavailable(String),

    #[error("Result store operation failed: {0}")]
    Backend(String),
}

/// Append-only result storage keyed by request id
///
/// Concurrent appends under one key must never lose entries, and
/// insertion order within a key must be preserved.
pub trait ResultStore: Send + Sync + 'static {
    fn append<'a>(&'a self, key: &'a str, items: Vec<Value>) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Every item appended under `key`, in insertion order. Unknown keys are empty.
    fn read_all<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<Value>, StoreError>>;

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Release the connection; later calls fail with [`StoreError::Unavailable`]
    fn close(&self) -> BoxFuture<'_, Result<(), StoreError>>;
}

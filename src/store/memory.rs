use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use super::{ResultStore, StoreError};

/// In-process result store over a sharded concurrent map
///
/// Appends to one key hold that key's shard lock for the duration of the
/// extend, so concurrent appends are serialized and nothing is lost.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Vec<Value>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("store is closed".into()));
        }
        Ok(())
    }
}

impl ResultStore for MemoryStore {
    fn append<'a>(&'a self, key: &'a str, items: Vec<Value>) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            self.ensure_open()?;
            let count = items.len();
            self.entries.entry(key.to_string()).or_default().extend(items);
            debug!(key, count, "Appended items");
            Ok(())
        }
        .boxed()
    }

    fn read_all<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<Value>, StoreError>> {
        async move {
            self.ensure_open()?;
            Ok(self
                .entries
                .get(key)
                .map(|entry| entry.value().clone())
                .unwrap_or_default())
        }
        .boxed()
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            self.ensure_open()?;
            self.entries.remove(key);
            Ok(())
        }
        .boxed()
    }

    fn close(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            self.closed.store(true, Ordering::Release);
            self.entries.clear();
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn append_preserves_order_within_a_key() {
        let store = MemoryStore::new();
        store.append("req", vec![json!(1), json!(2)]).await.unwrap();
        store.append("req", vec![json!(3)]).await.unwrap();

        assert_eq!(
            store.read_all("req").await.unwrap(),
            vec![json!(1), json!(2), json!(3)]
        );
    }

    #[tokio::test]
    async fn unknown_key_reads_empty_and_delete_is_idempotent() {
        let store = MemoryStore::new();
        assert!(store.read_all("missing").await.unwrap().is_empty());
        store.delete("missing").await.unwrap();
        store.delete("missing").await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_appends_lose_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut tasks = Vec::new();
        for worker in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                for page in 0..25 {
                    store
                        .append("shared", vec![json!({ "worker": worker, "page": page })])
                        .await
                        .unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.read_all("shared").await.unwrap().len(), 200);
    }

    #[tokio::test]
    async fn closed_store_is_unavailable() {
        let store = MemoryStore::new();
        store.append("req", vec![json!(1)]).await.unwrap();
        store.close().await.unwrap();

        assert!(matches!(
            store.read_all("req").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.append("req", vec![json!(2)]).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}

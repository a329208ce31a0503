//! Test utilities shared by the catalog_scan integration tests
//!
//! A scripted fetcher stands in for the browser: responses are queued per
//! URL, and every call is recorded so tests can assert which pages each
//! worker visited.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use catalog_scan::fetch::{FetchError, FetchedPage, FetcherFactory, PageFetcher};
use catalog_scan::scan_events::ScanEventBus;
use catalog_scan::store::{MemoryStore, ResultStore, StoreError};
use catalog_scan::supervisor::{Supervisor, SupervisorSettings};
use catalog_scan::worker::WorkerId;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{Value, json};

pub const LIST_URL: &str =
    "https://catalog.example.com/ns/v1/search?query=phone&cursor=1&pageSize=50&listPage=1";

/// Build a catalog page whose items are `{"id": n}`
pub fn page(ids: &[u64], has_more: bool) -> FetchedPage {
    FetchedPage {
        items: ids.iter().map(|id| json!({ "id": id })).collect(),
        has_more,
        total: None,
    }
}

pub fn ids(items: &[Value]) -> Vec<u64> {
    items.iter().filter_map(|item| item["id"].as_u64()).collect()
}

/// Scripted responses shared by every fetcher a factory creates
pub struct Script {
    responses: Mutex<HashMap<String, VecDeque<Result<FetchedPage, FetchError>>>>,
    fallback: Mutex<Result<FetchedPage, FetchError>>,
    calls: Mutex<Vec<(WorkerId, String)>>,
    panic_on: Mutex<HashSet<String>>,
    delay: Mutex<Duration>,
    resets: AtomicUsize,
}

impl Script {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            fallback: Mutex::new(Ok(page(&[], false))),
            calls: Mutex::new(Vec::new()),
            panic_on: Mutex::new(HashSet::new()),
            delay: Mutex::new(Duration::ZERO),
            resets: AtomicUsize::new(0),
        })
    }

    /// Queue one response for `url`; queued responses are used in order
    pub fn respond(&self, url: &str, response: Result<FetchedPage, FetchError>) {
        self.responses
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Response for any URL without a queued one
    pub fn set_fallback(&self, response: Result<FetchedPage, FetchError>) {
        *self.fallback.lock() = response;
    }

    /// Every fetch sleeps this long before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Fetching `url` panics the worker task
    pub fn panic_on(&self, url: &str) {
        self.panic_on.lock().insert(url.to_string());
    }

    pub fn calls(&self) -> Vec<(WorkerId, String)> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|(_, u)| u == url).count()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    fn next(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.responses
            .lock()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.lock().clone())
    }
}

pub struct ScriptedFetcher {
    worker: WorkerId,
    script: Arc<Script>,
}

impl PageFetcher for ScriptedFetcher {
    fn fetch<'a>(
        &'a mut self,
        url: &'a str,
        _referer: &'a str,
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<FetchedPage, FetchError>> {
        async move {
            self.script.calls.lock().push((self.worker, url.to_string()));
            if self.script.panic_on.lock().contains(url) {
                panic!("scripted crash on {url}");
            }
            let delay = *self.script.delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.script.next(url)
        }
        .boxed()
    }

    fn reset_session(&mut self) -> BoxFuture<'_, Result<(), FetchError>> {
        self.script.resets.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }.boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        async {}.boxed()
    }
}

pub struct ScriptedFactory {
    pub script: Arc<Script>,
    /// Workers whose session cannot be created
    pub broken: Mutex<HashSet<WorkerId>>,
    pub created: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new(script: Arc<Script>) -> Arc<Self> {
        Arc::new(Self {
            script,
            broken: Mutex::new(HashSet::new()),
            created: AtomicUsize::new(0),
        })
    }
}

impl FetcherFactory for ScriptedFactory {
    fn create(&self, worker: WorkerId) -> BoxFuture<'_, Result<Box<dyn PageFetcher>, FetchError>> {
        async move {
            if self.broken.lock().contains(&worker) {
                return Err(FetchError::Session(format!("{worker} has no browser")));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            let fetcher: Box<dyn PageFetcher> = Box::new(ScriptedFetcher {
                worker,
                script: Arc::clone(&self.script),
            });
            Ok(fetcher)
        }
        .boxed()
    }
}

/// In-memory store whose reads or appends can be switched to fail
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_appends: AtomicBool,
    pub appends: AtomicUsize,
    pub deletes: Mutex<Vec<String>>,
    /// Every append sleeps this long before it lands
    pub append_delay: Mutex<Duration>,
}

impl ResultStore for FlakyStore {
    fn append<'a>(&'a self, key: &'a str, items: Vec<Value>) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            if self.fail_appends.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("append refused".into()));
            }
            let delay = *self.append_delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.appends.fetch_add(1, Ordering::SeqCst);
            self.inner.append(key, items).await
        }
        .boxed()
    }

    fn read_all<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<Value>, StoreError>> {
        async move {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("read refused".into()));
            }
            self.inner.read_all(key).await
        }
        .boxed()
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            self.deletes.lock().push(key.to_string());
            self.inner.delete(key).await
        }
        .boxed()
    }

    fn close(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        self.inner.close()
    }
}

/// Settings tuned for tests: no pause between pages, short fetch timeout
pub fn test_settings(workers: usize) -> SupervisorSettings {
    let mut settings = SupervisorSettings::new(workers);
    settings.worker.page_delay_jitter = Duration::ZERO;
    settings.worker.fetch_timeout = Duration::from_millis(200);
    settings.shutdown_grace = Duration::from_millis(500);
    settings
}

pub struct Pool {
    pub supervisor: Arc<Supervisor>,
    pub script: Arc<Script>,
    pub factory: Arc<ScriptedFactory>,
    pub store: Arc<FlakyStore>,
    pub events: Arc<ScanEventBus>,
}

/// Start a supervisor over scripted fetchers without waiting for readiness
pub fn spawn_pool(settings: SupervisorSettings, script: Arc<Script>) -> Pool {
    let factory = ScriptedFactory::new(Arc::clone(&script));
    spawn_pool_with(settings, factory)
}

pub fn spawn_pool_with(settings: SupervisorSettings, factory: Arc<ScriptedFactory>) -> Pool {
    let store = Arc::new(FlakyStore::default());
    let events = Arc::new(ScanEventBus::new(256));
    let supervisor = Supervisor::start(
        settings,
        Arc::clone(&factory) as Arc<dyn FetcherFactory>,
        Arc::clone(&store) as Arc<dyn ResultStore>,
        Arc::clone(&events),
    )
    .expect("supervisor starts");

    Pool {
        supervisor,
        script: Arc::clone(&factory.script),
        factory,
        store,
        events,
    }
}

/// Start a pool and wait until every worker is ready
pub async fn start_pool(workers: usize, script: Arc<Script>) -> Pool {
    start_pool_with(test_settings(workers), script).await
}

pub async fn start_pool_with(settings: SupervisorSettings, script: Arc<Script>) -> Pool {
    let pool = spawn_pool(settings, script);
    pool.supervisor
        .wait_until_started(Duration::from_secs(5))
        .await
        .expect("pool starts");
    pool
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_for(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

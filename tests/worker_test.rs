//! Worker task behaviour driven directly over its command channel

mod common;

use std::sync::Arc;
use std::time::Duration;

use catalog_scan::fetch::{FetchError, FetcherFactory};
use catalog_scan::store::{MemoryStore, ResultStore};
use catalog_scan::worker::{
    ScanTask, WorkerCommand, WorkerError, WorkerHandle, WorkerId, WorkerReport, WorkerSettings,
    run_worker, spawn_worker,
};
use common::*;
use tokio::sync::mpsc;
use tokio::time::timeout;

const URL: &str = "https://catalog.example.com/ns/v1/item?id=1";

fn settings() -> Arc<WorkerSettings> {
    Arc::new(WorkerSettings {
        page_delay_jitter: Duration::ZERO,
        fetch_timeout: Duration::from_millis(200),
        ..WorkerSettings::default()
    })
}

fn single(url: &str, request_id: &str) -> WorkerCommand {
    WorkerCommand::Scan(ScanTask {
        url: url.to_string(),
        request_id: request_id.to_string(),
        step: 1,
        batch_mode: false,
    })
}

struct Harness {
    handle: WorkerHandle,
    reports: mpsc::Receiver<WorkerReport>,
    store: Arc<MemoryStore>,
    script: Arc<Script>,
}

async fn start(script: Arc<Script>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let (tx, mut reports) = mpsc::channel(16);
    let handle = spawn_worker(
        WorkerId(0),
        ScriptedFactory::new(Arc::clone(&script)) as Arc<dyn FetcherFactory>,
        Arc::clone(&store) as Arc<dyn ResultStore>,
        settings(),
        tx,
    );

    let started = timeout(Duration::from_secs(1), reports.recv()).await.unwrap();
    assert_eq!(started, Some(WorkerReport::Started { worker: WorkerId(0) }));

    Harness {
        handle,
        reports,
        store,
        script,
    }
}

async fn next_report(reports: &mut mpsc::Receiver<WorkerReport>) -> WorkerReport {
    timeout(Duration::from_secs(2), reports.recv())
        .await
        .expect("report in time")
        .expect("channel open")
}

#[tokio::test]
async fn worker_installs_a_session_before_reporting_ready() {
    let script = Script::new();
    let _harness = start(Arc::clone(&script)).await;
    assert_eq!(script.resets(), 1);
}

#[tokio::test]
async fn finished_scan_appends_items_then_reports() {
    let script = Script::new();
    script.respond(URL, Ok(page(&[1, 2], false)));
    let mut h = start(script).await;

    h.handle.commands.send(single(URL, "r1")).await.unwrap();

    assert_eq!(
        next_report(&mut h.reports).await,
        WorkerReport::ScanFinished {
            request_id: "r1".into(),
            worker: WorkerId(0)
        }
    );
    assert_eq!(ids(&h.store.read_all("r1").await.unwrap()), vec![1, 2]);
}

#[tokio::test]
async fn empty_page_is_not_appended() {
    let script = Script::new();
    let mut h = start(script).await;

    h.handle.commands.send(single(URL, "r-empty")).await.unwrap();
    assert!(matches!(
        next_report(&mut h.reports).await,
        WorkerReport::ScanFinished { .. }
    ));
    assert!(!h.store.contains_key("r-empty"));
}

#[tokio::test]
async fn cancel_during_fetch_drops_the_page() {
    let script = Script::new();
    script.set_delay(Duration::from_millis(150));
    script.respond(URL, Ok(page(&[1], false)));
    let mut h = start(script).await;
    let resets_before = h.script.resets();

    h.handle.commands.send(single(URL, "r-cancel")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    h.handle.commands.send(WorkerCommand::Cancel).await.unwrap();

    assert!(timeout(Duration::from_millis(400), h.reports.recv()).await.is_err());
    assert!(!h.store.contains_key("r-cancel"));
    assert!(h.script.resets() > resets_before);
}

#[tokio::test]
async fn scan_received_while_busy_runs_afterwards() {
    let script = Script::new();
    script.set_delay(Duration::from_millis(50));
    let other = "https://catalog.example.com/ns/v1/item?id=2";
    script.respond(URL, Ok(page(&[1], false)));
    script.respond(other, Ok(page(&[2], false)));
    let mut h = start(script).await;

    h.handle.commands.send(single(URL, "first")).await.unwrap();
    h.handle.commands.send(single(other, "second")).await.unwrap();

    let first = next_report(&mut h.reports).await;
    let second = next_report(&mut h.reports).await;
    assert!(matches!(first, WorkerReport::ScanFinished { ref request_id, .. } if request_id == "first"));
    assert!(matches!(second, WorkerReport::ScanFinished { ref request_id, .. } if request_id == "second"));
}

#[tokio::test]
async fn shutdown_ends_the_task_cleanly() {
    let h = start(Script::new()).await;
    h.handle.commands.send(WorkerCommand::Shutdown).await.unwrap();

    let result = timeout(Duration::from_secs(1), h.handle.task).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn worker_without_a_browser_fails_to_start() {
    let script = Script::new();
    let factory = ScriptedFactory::new(script);
    factory.broken.lock().insert(WorkerId(3));
    let (tx, mut reports) = mpsc::channel(4);

    let handle = spawn_worker(
        WorkerId(3),
        factory as Arc<dyn FetcherFactory>,
        Arc::new(MemoryStore::new()) as Arc<dyn ResultStore>,
        settings(),
        tx,
    );

    let result = handle.task.await.unwrap();
    assert!(matches!(
        result,
        Err(WorkerError::Init(FetchError::Session(_)))
    ));
    assert_eq!(reports.recv().await, None);
}

#[tokio::test]
async fn batch_task_with_unreadable_position_reports_error() {
    let mut h = start(Script::new()).await;

    h.handle
        .commands
        .send(WorkerCommand::Scan(ScanTask {
            url: "https://catalog.example.com/search?cursor=1".into(),
            request_id: "r-bad".into(),
            step: 2,
            batch_mode: true,
        }))
        .await
        .unwrap();

    assert!(matches!(
        next_report(&mut h.reports).await,
        WorkerReport::ScanError { ref request_id, .. } if request_id == "r-bad"
    ));
    assert!(h.script.calls().is_empty());
}

#[test]
fn worker_future_can_move_between_threads() {
    fn assert_send<T: Send>(_: &T) {}

    let (_commands, inbox) = mpsc::channel(1);
    let (reports, _rx) = mpsc::channel(1);
    let worker = run_worker(
        WorkerId(0),
        ScriptedFactory::new(Script::new()) as Arc<dyn FetcherFactory>,
        Arc::new(MemoryStore::new()) as Arc<dyn ResultStore>,
        settings(),
        inbox,
        reports,
    );
    assert_send(&worker);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batch_slice_walks_pages_on_a_multi_thread_runtime() {
    let script = Script::new();
    let first = "https://catalog.example.com/search?cursor=0&pageSize=10&listPage=1";
    script.respond(first, Ok(page(&[0], true)));
    script.set_fallback(Ok(page(&[10], false)));
    let mut h = start(script).await;

    h.handle
        .commands
        .send(WorkerCommand::Scan(ScanTask {
            url: first.into(),
            request_id: "r-mt".into(),
            step: 1,
            batch_mode: true,
        }))
        .await
        .unwrap();

    assert!(matches!(
        next_report(&mut h.reports).await,
        WorkerReport::ScanFinished { ref request_id, .. } if request_id == "r-mt"
    ));
    assert_eq!(
        h.script.calls_for("https://catalog.example.com/search?cursor=10&pageSize=10&listPage=2"),
        1
    );
    assert_eq!(ids(&h.store.read_all("r-mt").await.unwrap()), vec![0, 10]);
}

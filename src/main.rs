// catalog-scan: HTTP front door over a pool of browser scan workers
//
// Configured through environment variables (see `ServiceConfig::from_env`).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use catalog_scan::admission::CapacitySource;
use catalog_scan::http::{AppState, HttpServer, PageQueue};
use catalog_scan::utils::{EVENT_BUS_CAPACITY, STARTUP_TIMEOUT_SECS};
use catalog_scan::{
    BrowserLaunchOptions, ChromiumFetcherFactory, FetcherFactory, MemoryStore, ResultStore,
    ScanEventBus, ServiceConfig, Supervisor, SupervisorSettings,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env().context("Invalid configuration")?;
    info!(
        workers = config.workers(),
        bind = %config.bind_address(),
        headless = config.headless(),
        "Starting catalog-scan"
    );
    if let Some(proxy) = config.proxy() {
        info!(
            proxy = %proxy.address,
            authenticated = proxy.username.is_some(),
            checked = proxy.check_url.is_some(),
            "Browsers connect through proxy"
        );
    }

    let events = Arc::new(ScanEventBus::new(EVENT_BUS_CAPACITY));
    let store: Arc<dyn ResultStore> = Arc::new(MemoryStore::new());
    let factory: Arc<dyn FetcherFactory> =
        Arc::new(ChromiumFetcherFactory::new(BrowserLaunchOptions::from(&config)));

    let supervisor = Supervisor::start(SupervisorSettings::from(&config), factory, store, events)
        .context("Failed to start worker pool")?;

    if let Err(e) = supervisor
        .wait_until_started(Duration::from_secs(STARTUP_TIMEOUT_SECS))
        .await
    {
        supervisor.shutdown().await;
        return Err(e).context("Worker pool failed to start");
    }

    let capacity: Arc<dyn CapacitySource> = supervisor.clone();
    let queue = PageQueue::new(capacity);
    let admission_watch = queue.watch(supervisor.idle_notifier());

    let server = HttpServer::new(
        config.bind_address(),
        AppState {
            supervisor: Arc::clone(&supervisor),
            queue,
            server_timeout: config.server_timeout(),
        },
    );
    let served = server.run(shutdown_signal()).await;

    admission_watch.abort();
    supervisor.shutdown().await;
    info!("catalog-scan stopped");

    served
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
        _ = wait_for_sigterm() => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}

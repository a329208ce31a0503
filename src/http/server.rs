use std::future::Future;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use super::handlers::AppState;
use super::routes::create_router;

pub struct HttpServer {
    addr: String,
    state: AppState,
}

impl HttpServer {
    pub fn new(addr: impl Into<String>, state: AppState) -> Self {
        Self {
            addr: addr.into(),
            state,
        }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {}", self.addr))?;

        info!("HTTP server listening on http://{}", self.addr);

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("HTTP server shutting down");
            })
            .await
            .context("HTTP server error")?;

        Ok(())
    }
}

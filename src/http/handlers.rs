//! Route handlers

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::errors::ApiError;
use crate::admission::AdmissionQueue;
use crate::scan_events::{MetricsSnapshot, ScanOutcome};
use crate::supervisor::{PoolStats, Supervisor};

/// What an admitted single-page job resolves to
pub type PageResult = Result<ScanOutcome, ApiError>;
pub type PageQueue = AdmissionQueue<PageResult>;

#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub queue: PageQueue,
    pub server_timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub pool: PoolStats,
    pub queue_pending: usize,
    pub queue_running: usize,
    pub events: MetricsSnapshot,
}

/// Cancels the request unless disarmed; dropped when the client goes away
struct CancelOnDrop {
    supervisor: Arc<Supervisor>,
    request_id: String,
    armed: bool,
}

impl CancelOnDrop {
    fn new(supervisor: Arc<Supervisor>, request_id: String) -> Self {
        Self {
            supervisor,
            request_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            warn!(request_id = %self.request_id, "Request abandoned, cancelling");
            self.supervisor.cancel_request(&self.request_id);
        }
    }
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { ok: true })
}

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        pool: state.supervisor.stats(),
        queue_pending: state.queue.pending(),
        queue_running: state.queue.running(),
        events: state.supervisor.events().metrics().snapshot(),
    })
}

/// Scan every page of a paginated listing across all idle workers
pub async fn scan(
    State(state): State<AppState>,
    Query(query): Query<ScanQuery>,
) -> Result<Json<Arc<Vec<Value>>>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let mut outcome = state.supervisor.events().subscribe_request(request_id.clone());

    let workers = state.supervisor.scan_all_pages(&query.url, &request_id)?;
    if workers == 0 {
        return Err(ApiError::Unavailable);
    }
    info!(request_id, url = %query.url, workers, "Batch scan accepted");

    let mut guard = CancelOnDrop::new(Arc::clone(&state.supervisor), request_id.clone());
    let result = outcome.recv_outcome().await;
    guard.disarm();

    into_items(&request_id, result.map_err(ApiError::from))
}

/// Scan one page through the admission queue
///
/// The timeout starts once the job is admitted; a timed out request is
/// cancelled so its worker returns to the pool.
pub async fn page(
    State(state): State<AppState>,
    Query(query): Query<ScanQuery>,
) -> Result<Json<Arc<Vec<Value>>>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let mut guard = CancelOnDrop::new(Arc::clone(&state.supervisor), request_id.clone());

    let supervisor = Arc::clone(&state.supervisor);
    let timeout = state.server_timeout;
    let job_request_id = request_id.clone();
    let url = query.url;

    let result = state
        .queue
        .push(move || {
            let mut outcome = supervisor.events().subscribe_request(job_request_id.clone());
            let dispatched = supervisor.scan_single_page(&url, &job_request_id);
            async move {
                if !dispatched {
                    return Err(ApiError::Unavailable);
                }
                match tokio::time::timeout(timeout, outcome.recv_outcome()).await {
                    Ok(outcome) => outcome.map_err(ApiError::from),
                    Err(_) => Err(ApiError::Timeout),
                }
            }
            .boxed()
        })
        .await
        .map_err(ApiError::from)
        .and_then(|result| result);

    if !matches!(result, Err(ApiError::Timeout)) {
        guard.disarm();
    }
    into_items(&request_id, result)
}

fn into_items(request_id: &str, result: PageResult) -> Result<Json<Arc<Vec<Value>>>, ApiError> {
    match result {
        Ok(ScanOutcome::Finished { items }) => Ok(Json(items)),
        Ok(ScanOutcome::Partial {
            items,
            failed_workers,
        }) => {
            warn!(
                request_id,
                failed = failed_workers.len(),
                returned = items.len(),
                "Returning partial results"
            );
            Ok(Json(items))
        }
        Ok(ScanOutcome::Failed { reason }) => {
            warn!(request_id, reason, "Scan failed");
            Err(ApiError::ScanFailed(reason))
        }
        Err(e) => {
            warn!(request_id, error = %e, "Scan request ended without a result");
            Err(e)
        }
    }
}

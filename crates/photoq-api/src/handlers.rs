//! HTTP handlers.

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use photoq_models::{PhotoRecord, PhotoStatus};
use photoq_queue::{PhotoQueue, QueueResult};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::AppState;

/// Publishing seam so batch submission is testable without a broker.
#[async_trait]
pub trait JobPublisher: Send + Sync {
    async fn publish(&self, photo_id: &Uuid) -> QueueResult<()>;
}

#[async_trait]
impl JobPublisher for PhotoQueue {
    async fn publish(&self, photo_id: &Uuid) -> QueueResult<()> {
        PhotoQueue::publish(self, photo_id).await
    }
}

/// Outcome of one submission batch.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Inputs that parsed as UUIDs and were enqueued.
    pub accepted: Vec<Uuid>,
    /// Inputs that did not parse, echoed back verbatim.
    pub rejected: Vec<String>,
}

/// Partition a batch of raw inputs and publish one job per valid UUID.
///
/// Invalid entries never reach the queue. A publish failure aborts the
/// batch; entries already published stay published.
pub async fn submit_batch<P: JobPublisher>(
    publisher: &P,
    inputs: &[String],
) -> ApiResult<BatchOutcome> {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for input in inputs {
        match Uuid::parse_str(input) {
            Ok(id) => accepted.push(id),
            Err(_) => rejected.push(input.clone()),
        }
    }

    for id in &accepted {
        publisher.publish(id).await?;
    }

    Ok(BatchOutcome { accepted, rejected })
}

/// POST /photos/process
///
/// Accepts a JSON array of photo id strings. Valid UUIDs are enqueued;
/// the rest are echoed back. A non-empty batch with nothing valid is a
/// client error.
pub async fn process_photos(
    State(state): State<AppState>,
    ApiJson(inputs): ApiJson<Vec<String>>,
) -> ApiResult<(StatusCode, Json<BatchOutcome>)> {
    let outcome = submit_batch(state.queue.as_ref(), &inputs).await?;

    if outcome.accepted.is_empty() && !inputs.is_empty() {
        warn!(rejected = outcome.rejected.len(), "submission batch had no valid ids");
        return Err(ApiError::bad_request(
            "none of the provided photo ids could be parsed as a UUID",
        ));
    }

    info!(
        accepted = outcome.accepted.len(),
        rejected = outcome.rejected.len(),
        "submitted photo batch"
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /photos/pending
pub async fn pending_photos(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PhotoRecord>>> {
    let photos = state.store.get_by_status(PhotoStatus::Pending).await?;
    Ok(Json(photos))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /ready
///
/// Probes both backing services; the queue depth doubles as the probe.
pub async fn ready(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.store.ping().await?;
    let depth = state.queue.len().await?;
    Ok(Json(json!({ "status": "ready", "queue_depth": depth })))
}

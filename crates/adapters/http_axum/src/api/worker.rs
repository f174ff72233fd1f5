//! On-demand worker pass.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use hearth_app::ports::{EventStore, JobQueue, RuleRepository};
use hearth_app::worker::WorkerReport;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RunQuery {
    /// Overrides the configured batch size; `0` falls back to it.
    pub batch_size: Option<usize>,
}

/// Possible responses from the run endpoint.
pub enum RunResponse {
    Ok(Json<WorkerReport>),
}

impl IntoResponse for RunResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/worker/run?batch_size=`: reclaim stale claims and process one
/// batch of due jobs.
pub async fn run<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Query(query): Query<RunQuery>,
) -> Result<RunResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let batch_size = query
        .batch_size
        .filter(|n| *n > 0)
        .unwrap_or(state.worker.config().batch_size);
    let report = state.worker.run_once(batch_size).await?;
    Ok(RunResponse::Ok(Json(report)))
}

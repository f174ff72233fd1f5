//! JSON REST handlers for jobs.
//!
//! `GET /api/jobs?status=failed` is the inbox of jobs that exhausted their
//! attempts or failed permanently.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use hearth_app::ports::{EventStore, JobFilter, JobQueue, RuleRepository};
use hearth_domain::id::{HouseholdId, JobId};
use hearth_domain::job::Job;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for running an action by hand.
#[derive(Deserialize)]
pub struct TriggerRequest {
    pub household_id: HouseholdId,
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Job>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<Job>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the trigger endpoint.
pub enum TriggerResponse {
    Created(Json<Job>),
}

impl IntoResponse for TriggerResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// `GET /api/jobs?household_id=&status=&limit=`: list jobs, newest first.
pub async fn list<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Query(filter): Query<JobFilter>,
) -> Result<ListResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let jobs = state.job_service.list_jobs(filter).await?;
    Ok(ListResponse::Ok(Json(jobs)))
}

/// `GET /api/jobs/{id}`: get job by ID.
pub async fn get<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let job_id: JobId = parse_id(&id)?;
    let job = state.job_service.get_job(job_id).await?;
    Ok(GetResponse::Ok(Json(job)))
}

/// `POST /api/jobs`: enqueue a one-off job outside any rule.
pub async fn trigger<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Json(req): Json<TriggerRequest>,
) -> Result<TriggerResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let job = state
        .job_service
        .trigger(req.household_id, &req.action, req.params)
        .await?;
    Ok(TriggerResponse::Created(Json(job)))
}

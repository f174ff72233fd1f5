//! JSON REST handlers for domain events.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use hearth_app::dispatcher::DispatchReport;
use hearth_app::ports::{EventStore, JobQueue, RuleRepository};
use hearth_domain::event::DomainEvent;
use hearth_domain::id::{EventId, HouseholdId};
use hearth_domain::time::Timestamp;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Default and maximum page size of the list endpoint.
const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Request body for reporting an event.
///
/// Producers may assign the id themselves so that re-delivering the same
/// event is recognised; otherwise a fresh id is generated.
#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub id: Option<EventId>,
    pub household_id: HouseholdId,
    pub event_type: String,
    pub source: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub occurred_at: Option<Timestamp>,
}

impl From<CreateEventRequest> for DomainEvent {
    fn from(req: CreateEventRequest) -> Self {
        let mut event = DomainEvent::new(req.household_id, req.event_type, req.source, req.payload);
        if let Some(id) = req.id {
            event = event.with_id(id);
        }
        if let Some(ts) = req.occurred_at {
            event = event.occurred_at(ts);
        }
        event
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// The stored event together with what dispatching it produced.
#[derive(Serialize)]
pub struct RecordedEvent {
    pub event: DomainEvent,
    pub report: DispatchReport,
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<RecordedEvent>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<DomainEvent>>),
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
    Ok(Json<DomainEvent>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the dispatch endpoint.
pub enum DispatchResponse {
    Ok(Json<DispatchReport>),
}

impl IntoResponse for DispatchResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/events`: persist an event and enqueue the jobs it triggers.
pub async fn create<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Json(req): Json<CreateEventRequest>,
) -> Result<CreateResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let (event, report) = state
        .event_service
        .record_and_dispatch(DomainEvent::from(req))
        .await?;
    Ok(CreateResponse::Created(Json(RecordedEvent { event, report })))
}

/// `GET /api/events?limit=`: list recent events, newest first.
pub async fn list<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Query(query): Query<ListQuery>,
) -> Result<ListResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let events = state.event_service.recent_events(limit).await?;
    Ok(ListResponse::Ok(Json(events)))
}

/// `GET /api/events/{id}`: get event by ID.
pub async fn get<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let event_id: EventId = parse_id(&id)?;
    let event = state.event_service.get_event(event_id).await?;
    Ok(GetResponse::Ok(Json(event)))
}

/// `POST /api/events/{id}/dispatch`: dispatch a stored event again.
pub async fn dispatch<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Path(id): Path<String>,
) -> Result<DispatchResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let event_id: EventId = parse_id(&id)?;
    let report = state.event_service.redispatch(event_id).await?;
    Ok(DispatchResponse::Ok(Json(report)))
}

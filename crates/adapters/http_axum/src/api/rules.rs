//! JSON REST handlers for rules.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use hearth_app::ports::{EventStore, JobQueue, RuleRepository};
use hearth_domain::id::{HouseholdId, RuleId};
use hearth_domain::rule::{ActionSpec, Rule, RuleBuilder};

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating or replacing a rule.
#[derive(Deserialize)]
pub struct RuleRequest {
    pub name: String,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub triggers: Vec<String>,
    pub actions: Vec<ActionSpec>,
}

impl RuleRequest {
    fn into_builder(self) -> RuleBuilder {
        let mut builder = Rule::builder().name(self.name);
        if let Some(description) = self.description {
            builder = builder.description(description);
        }
        if let Some(enabled) = self.enabled {
            builder = builder.enabled(enabled);
        }
        for trigger in self.triggers {
            builder = builder.trigger(trigger);
        }
        for spec in self.actions {
            builder = builder.action_spec(spec);
        }
        builder
    }
}

/// Request body for enabling or disabling a rule.
#[derive(Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Rule>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get, update and set-enabled endpoints.
pub enum GetResponse {
    Ok(Json<Rule>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Rule>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/households/{household_id}/rules`: list a household's rules.
pub async fn list<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Path(household_id): Path<String>,
) -> Result<ListResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let household_id: HouseholdId = parse_id(&household_id)?;
    let rules = state.rule_service.list_rules(household_id).await?;
    Ok(ListResponse::Ok(Json(rules)))
}

/// `POST /api/households/{household_id}/rules`: create a rule.
pub async fn create<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Path(household_id): Path<String>,
    Json(req): Json<RuleRequest>,
) -> Result<CreateResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let household_id: HouseholdId = parse_id(&household_id)?;
    let rule = req
        .into_builder()
        .household_id(household_id)
        .build()?;
    let created = state.rule_service.create_rule(rule).await?;
    Ok(CreateResponse::Created(Json(created)))
}

/// `GET /api/rules/{id}`: get rule by ID.
pub async fn get<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let rule_id: RuleId = parse_id(&id)?;
    let rule = state.rule_service.get_rule(rule_id).await?;
    Ok(GetResponse::Ok(Json(rule)))
}

/// `PUT /api/rules/{id}`: replace a rule's definition.
pub async fn update<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Path(id): Path<String>,
    Json(req): Json<RuleRequest>,
) -> Result<GetResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let rule_id: RuleId = parse_id(&id)?;
    // Household and creation time come from the stored rule.
    let rule = req
        .into_builder()
        .id(rule_id)
        .build()?;
    let updated = state.rule_service.update_rule(rule).await?;
    Ok(GetResponse::Ok(Json(updated)))
}

/// `PUT /api/rules/{id}/enabled`: enable or disable a rule.
pub async fn set_enabled<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Path(id): Path<String>,
    Json(req): Json<SetEnabledRequest>,
) -> Result<GetResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let rule_id: RuleId = parse_id(&id)?;
    let rule = state
        .rule_service
        .set_enabled(rule_id, req.enabled)
        .await?;
    Ok(GetResponse::Ok(Json(rule)))
}

/// `DELETE /api/rules/{id}`: delete a rule.
pub async fn delete<R, Q, E>(
    State(state): State<AppState<R, Q, E>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    let rule_id: RuleId = parse_id(&id)?;
    state.rule_service.delete_rule(rule_id).await?;
    Ok(DeleteResponse::NoContent)
}


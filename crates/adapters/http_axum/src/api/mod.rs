//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod events;
#[allow(clippy::missing_errors_doc)]
pub mod jobs;
#[allow(clippy::missing_errors_doc)]
pub mod rules;
#[allow(clippy::missing_errors_doc)]
pub mod worker;

use std::str::FromStr;

use axum::Router;
use axum::routing::{get, post, put};

use hearth_app::ports::{EventStore, JobQueue, RuleRepository};

use crate::error::ApiError;
use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<R, Q, E>() -> Router<AppState<R, Q, E>>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    Router::new()
        // Events
        .route(
            "/events",
            get(events::list::<R, Q, E>).post(events::create::<R, Q, E>),
        )
        .route("/events/{id}", get(events::get::<R, Q, E>))
        .route("/events/{id}/dispatch", post(events::dispatch::<R, Q, E>))
        // Rules
        .route(
            "/households/{household_id}/rules",
            get(rules::list::<R, Q, E>).post(rules::create::<R, Q, E>),
        )
        .route(
            "/rules/{id}",
            get(rules::get::<R, Q, E>)
                .put(rules::update::<R, Q, E>)
                .delete(rules::delete::<R, Q, E>),
        )
        .route("/rules/{id}/enabled", put(rules::set_enabled::<R, Q, E>))
        // Jobs
        .route(
            "/jobs",
            get(jobs::list::<R, Q, E>).post(jobs::trigger::<R, Q, E>),
        )
        .route("/jobs/{id}", get(jobs::get::<R, Q, E>))
        // Worker
        .route("/worker/run", post(worker::run::<R, Q, E>))
}

/// Parse an identifier taken from the request path.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    T::from_str(raw).map_err(|_| ApiError::invalid_id(raw))
}

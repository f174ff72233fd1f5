//! Shared application state for axum handlers.

use std::sync::Arc;

use hearth_app::ports::{EventStore, JobQueue, RuleRepository};
use hearth_app::services::event_service::EventService;
use hearth_app::services::job_service::JobService;
use hearth_app::services::rule_service::RuleService;
use hearth_app::worker::Worker;

/// Application state shared across all axum handlers.
///
/// Generic over the rule repository, job queue and event store to avoid
/// dynamic dispatch. `Clone` is implemented manually so the underlying types
/// themselves do not need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<R, Q, E> {
    /// Rule CRUD service.
    pub rule_service: Arc<RuleService<R>>,
    /// Job inspection and manual triggers.
    pub job_service: Arc<JobService<Q>>,
    /// Event ingestion and dispatch.
    pub event_service: Arc<EventService<E, R, Q>>,
    /// Worker shared with the background loop, for on-demand passes.
    pub worker: Arc<Worker<Q>>,
}

impl<R, Q, E> Clone for AppState<R, Q, E> {
    fn clone(&self) -> Self {
        Self {
            rule_service: Arc::clone(&self.rule_service),
            job_service: Arc::clone(&self.job_service),
            event_service: Arc::clone(&self.event_service),
            worker: Arc::clone(&self.worker),
        }
    }
}

impl<R, Q, E> AppState<R, Q, E>
where
    R: RuleRepository + Send + Sync + 'static,
    Q: JobQueue + Send + Sync + 'static,
    E: EventStore + Send + Sync + 'static,
{
    /// Create a new application state from service instances.
    pub fn new(
        rule_service: RuleService<R>,
        job_service: JobService<Q>,
        event_service: EventService<E, R, Q>,
        worker: Worker<Q>,
    ) -> Self {
        Self {
            rule_service: Arc::new(rule_service),
            job_service: Arc::new(job_service),
            event_service: Arc::new(event_service),
            worker: Arc::new(worker),
        }
    }

    /// Create a new application state from pre-wrapped `Arc` services.
    ///
    /// Use this when the worker is also driven by a background task.
    pub fn from_arcs(
        rule_service: Arc<RuleService<R>>,
        job_service: Arc<JobService<Q>>,
        event_service: Arc<EventService<E, R, Q>>,
        worker: Arc<Worker<Q>>,
    ) -> Self {
        Self {
            rule_service,
            job_service,
            event_service,
            worker,
        }
    }
}

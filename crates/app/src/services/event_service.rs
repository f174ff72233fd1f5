//! Event service: ingesting domain events and fanning them out to jobs.

use std::sync::Arc;

use hearth_domain::error::{HearthError, NotFoundError};
use hearth_domain::event::DomainEvent;
use hearth_domain::id::EventId;

use crate::dispatcher::{DispatchReport, EventDispatcher};
use crate::ports::{EventStore, JobQueue, RuleRepository};

/// Persists incoming events, then dispatches them.
///
/// An event is stored before any job is enqueued for it, so every job's
/// `event_id` refers to a stored event.
pub struct EventService<E, R, Q> {
    events: E,
    dispatcher: Arc<EventDispatcher<R, Q>>,
}

impl<E, R, Q> EventService<E, R, Q>
where
    E: EventStore,
    R: RuleRepository,
    Q: JobQueue,
{
    pub fn new(events: E, dispatcher: Arc<EventDispatcher<R, Q>>) -> Self {
        Self { events, dispatcher }
    }

    /// Validate, persist and dispatch `event`.
    ///
    /// Re-delivering a stored event dispatches the stored copy again; its
    /// jobs already exist, so the report only counts duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] for malformed events, or a storage
    /// error from the event store or the rule store.
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn record_and_dispatch(
        &self,
        event: DomainEvent,
    ) -> Result<(DomainEvent, DispatchReport), HearthError> {
        event.validate()?;
        let stored = self.events.store(event).await?;
        let report = self.dispatcher.dispatch(&stored).await?;
        Ok((stored, report))
    }

    /// Dispatch a stored event again, e.g. after rules changed or a
    /// dispatch reported enqueue errors.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::NotFound`] for unknown ids, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn redispatch(&self, id: EventId) -> Result<DispatchReport, HearthError> {
        let event = self.get_event(id).await?;
        self.dispatcher.dispatch(&event).await
    }

    /// # Errors
    ///
    /// Returns [`HearthError::NotFound`] for unknown ids, or a storage error.
    pub async fn get_event(&self, id: EventId) -> Result<DomainEvent, HearthError> {
        self.events.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Event",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the event store.
    pub async fn recent_events(&self, limit: usize) -> Result<Vec<DomainEvent>, HearthError> {
        self.events.get_recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use hearth_domain::error::ValidationError;
    use hearth_domain::id::HouseholdId;
    use hearth_domain::job::{DedupeKey, JobStatus, RetryPolicy};
    use hearth_domain::rule::Rule;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::actions::{Action, ActionContext, ActionError, ActionRegistry, ActionResult};
    use crate::services::rule_service::RuleService;
    use crate::testing::{InMemoryEvents, InMemoryJobQueue, InMemoryRules};
    use crate::worker::{Worker, WorkerConfig};

    #[derive(Deserialize)]
    struct NotifyParams {
        #[allow(dead_code)]
        title: String,
    }

    /// `notify` stand-in whose outcome can be switched at runtime.
    struct SwitchableNotify {
        failing: Arc<AtomicBool>,
    }

    impl Action for SwitchableNotify {
        const NAME: &'static str = "notify";
        type Params = NotifyParams;

        async fn execute(
            &self,
            _: &ActionContext,
            _: NotifyParams,
        ) -> Result<ActionResult, ActionError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(ActionError::Failed("inbox unavailable".into()))
            } else {
                Ok(ActionResult::ok("delivered"))
            }
        }
    }

    struct Engine {
        events: EventService<Arc<InMemoryEvents>, Arc<InMemoryRules>, Arc<InMemoryJobQueue>>,
        rules: RuleService<Arc<InMemoryRules>>,
        worker: Worker<Arc<InMemoryJobQueue>>,
        queue: Arc<InMemoryJobQueue>,
        failing: Arc<AtomicBool>,
    }

    fn engine() -> Engine {
        let failing = Arc::new(AtomicBool::new(false));
        let mut registry = ActionRegistry::new();
        registry.register(SwitchableNotify {
            failing: Arc::clone(&failing),
        });
        let registry = Arc::new(registry);
        let retry = RetryPolicy::immediate(3);

        let rules = Arc::new(InMemoryRules::default());
        let queue = Arc::new(InMemoryJobQueue::default());
        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::clone(&rules),
            Arc::clone(&queue),
            &retry,
        ));
        let worker = Worker::new(
            Arc::clone(&queue),
            Arc::clone(&registry),
            WorkerConfig {
                retry,
                ..WorkerConfig::default()
            },
        );
        Engine {
            events: EventService::new(Arc::new(InMemoryEvents::default()), dispatcher),
            rules: RuleService::new(rules, registry),
            worker,
            queue,
            failing,
        }
    }

    async fn bill_rule(engine: &Engine, household_id: HouseholdId) -> Rule {
        let rule = Rule::builder()
            .household_id(household_id)
            .name("Bill due soon")
            .trigger("bill.due_soon")
            .action("notify", json!({"title": "A bill is due soon"}))
            .build()
            .unwrap();
        engine.rules.create_rule(rule).await.unwrap()
    }

    fn due_soon(household_id: HouseholdId) -> DomainEvent {
        DomainEvent::new(household_id, "bill.due_soon", "bills", json!({"bill": "rent"}))
    }

    #[tokio::test]
    async fn should_run_redelivered_event_once() {
        let engine = engine();
        let hh = HouseholdId::new();
        bill_rule(&engine, hh).await;
        let event = due_soon(hh);

        let (_, first) = engine.events.record_and_dispatch(event.clone()).await.unwrap();
        assert_eq!(first.jobs_created, 1);
        let jobs = engine.queue.all();
        assert_eq!(
            jobs[0].dedupe_key,
            DedupeKey::for_event_action(event.id, 0, "notify")
        );
        assert_eq!(jobs[0].status, JobStatus::Pending);

        let (_, second) = engine.events.record_and_dispatch(event.clone()).await.unwrap();
        assert_eq!(second.jobs_created, 0);
        assert_eq!(second.jobs_skipped_duplicate, 1);

        let report = engine.worker.run_once(10).await.unwrap();
        assert_eq!(report.completed, 1);
        assert_eq!(engine.queue.all()[0].status, JobStatus::Completed);

        // Re-dispatching after completion must not run the action again.
        engine.events.redispatch(event.id).await.unwrap();
        let report = engine.worker.run_once(10).await.unwrap();
        assert_eq!(report.claimed, 0);
        assert_eq!(engine.queue.all().len(), 1);
    }

    #[tokio::test]
    async fn should_fail_job_after_three_attempts() {
        let engine = engine();
        let hh = HouseholdId::new();
        bill_rule(&engine, hh).await;
        engine.failing.store(true, Ordering::SeqCst);

        engine.events.record_and_dispatch(due_soon(hh)).await.unwrap();
        for _ in 0..3 {
            engine.worker.run_once(10).await.unwrap();
        }

        let job = engine.queue.all().remove(0);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 3);
        assert_eq!(job.last_error.as_deref(), Some("inbox unavailable"));

        let fourth = engine.worker.run_once(10).await.unwrap();
        assert_eq!(fourth.claimed, 0);
        assert_eq!(engine.queue.all()[0].attempts, 3);
    }

    #[tokio::test]
    async fn should_stop_creating_jobs_once_rule_is_disabled() {
        let engine = engine();
        let hh = HouseholdId::new();
        let rule = bill_rule(&engine, hh).await;
        engine.events.record_and_dispatch(due_soon(hh)).await.unwrap();

        engine.rules.set_enabled(rule.id, false).await.unwrap();
        let (_, report) = engine.events.record_and_dispatch(due_soon(hh)).await.unwrap();

        assert_eq!(report.rules_matched, 0);
        assert_eq!(report.jobs_created, 0);
        let jobs = engine.queue.all();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn should_reject_event_without_type() {
        let engine = engine();
        let event = DomainEvent::new(HouseholdId::new(), " ", "bills", json!({}));

        let err = engine.events.record_and_dispatch(event).await.unwrap_err();

        assert!(matches!(
            err,
            HearthError::Validation(ValidationError::EmptyEventType)
        ));
        assert!(engine.events.recent_events(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_not_find_unknown_event() {
        let engine = engine();
        assert!(matches!(
            engine.events.redispatch(EventId::new()).await,
            Err(HearthError::NotFound(_))
        ));
    }
}

//! Event dispatcher: fans one domain event out into pending jobs.
//!
//! For every enabled rule of the event's household that lists the event type
//! as a trigger, one job is enqueued per action. Jobs carry a dedupe key
//! derived from `(event, action)`, so dispatching the same event twice, or
//! matching two rules that share an action, never runs that action twice for
//! the event. The dispatcher never runs handlers; that is the worker's job.

use hearth_domain::error::HearthError;
use hearth_domain::event::DomainEvent;
use hearth_domain::id::{EventId, JobId, RuleId};
use hearth_domain::job::{NewJob, RetryPolicy};
use serde::Serialize;

use crate::actions::error_chain;
use crate::ports::{EnqueueOutcome, JobQueue, RuleRepository};

/// A job that could not be enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchError {
    pub rule_id: RuleId,
    pub slot: usize,
    pub action: String,
    pub message: String,
}

/// Summary of one [`EventDispatcher::dispatch`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub event_id: EventId,
    pub rules_matched: usize,
    pub jobs_created: usize,
    pub jobs_skipped_duplicate: usize,
    pub job_ids: Vec<JobId>,
    pub errors: Vec<DispatchError>,
}

impl DispatchReport {
    fn empty(event_id: EventId) -> Self {
        Self {
            event_id,
            rules_matched: 0,
            jobs_created: 0,
            jobs_skipped_duplicate: 0,
            job_ids: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Whether every matching action was enqueued (or already was).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Matches events against rules and enqueues the resulting jobs.
pub struct EventDispatcher<R, Q> {
    rules: R,
    queue: Q,
    max_attempts: u32,
}

impl<R: RuleRepository, Q: JobQueue> EventDispatcher<R, Q> {
    /// Jobs created by this dispatcher get `retry.max_attempts` attempts.
    pub fn new(rules: R, queue: Q, retry: &RetryPolicy) -> Self {
        Self {
            rules,
            queue,
            max_attempts: retry.max_attempts,
        }
    }

    /// Enqueue one job per action of every rule matching `event`.
    ///
    /// Duplicates are counted, not reported as errors. A failed enqueue is
    /// recorded in the report and the remaining actions are still attempted.
    ///
    /// # Errors
    ///
    /// Returns the rule store's error if matching rules cannot be loaded.
    #[tracing::instrument(
        skip(self, event),
        fields(event_id = %event.id, event_type = %event.event_type)
    )]
    pub async fn dispatch(&self, event: &DomainEvent) -> Result<DispatchReport, HearthError> {
        let rules: Vec<_> = self
            .rules
            .find_enabled_for_event(event.household_id, &event.event_type)
            .await?
            .into_iter()
            .filter(|rule| rule.matches(event))
            .collect();

        let mut report = DispatchReport::empty(event.id);
        report.rules_matched = rules.len();

        for rule in &rules {
            for (slot, action) in rule.actions.iter().enumerate() {
                let job = NewJob::for_rule_action(event, rule, slot, action, self.max_attempts);
                let dedupe_key = job.dedupe_key.clone();
                match self.queue.enqueue(job).await {
                    Ok(EnqueueOutcome::Created(job)) => {
                        tracing::debug!(job_id = %job.id, %dedupe_key, "job enqueued");
                        report.jobs_created += 1;
                        report.job_ids.push(job.id);
                    }
                    Ok(EnqueueOutcome::Duplicate) => {
                        tracing::debug!(%dedupe_key, "job already enqueued");
                        report.jobs_skipped_duplicate += 1;
                    }
                    Err(err) => {
                        tracing::warn!(%dedupe_key, error = %error_chain(&err), "failed to enqueue job");
                        report.errors.push(DispatchError {
                            rule_id: rule.id,
                            slot,
                            action: action.name.clone(),
                            message: error_chain(&err),
                        });
                    }
                }
            }
        }

        tracing::info!(
            rules_matched = report.rules_matched,
            jobs_created = report.jobs_created,
            duplicates = report.jobs_skipped_duplicate,
            errors = report.errors.len(),
            "event dispatched"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hearth_domain::id::HouseholdId;
    use hearth_domain::job::{DedupeKey, JobStatus};
    use hearth_domain::rule::Rule;
    use serde_json::json;

    use super::*;
    use crate::testing::{InMemoryJobQueue, InMemoryRules};

    fn rule(household_id: HouseholdId, trigger: &str, actions: &[&str]) -> Rule {
        let mut builder = Rule::builder()
            .household_id(household_id)
            .name(format!("on {trigger}"))
            .trigger(trigger);
        for action in actions {
            builder = builder.action(*action, json!({"title": "t"}));
        }
        builder.build().unwrap()
    }

    fn dispatcher(
        rules: Vec<Rule>,
    ) -> (
        EventDispatcher<Arc<InMemoryRules>, Arc<InMemoryJobQueue>>,
        Arc<InMemoryRules>,
        Arc<InMemoryJobQueue>,
    ) {
        let repo = Arc::new(InMemoryRules::with(rules));
        let queue = Arc::new(InMemoryJobQueue::default());
        let dispatcher = EventDispatcher::new(
            Arc::clone(&repo),
            Arc::clone(&queue),
            &RetryPolicy::default(),
        );
        (dispatcher, repo, queue)
    }

    fn event(household_id: HouseholdId, event_type: &str) -> DomainEvent {
        DomainEvent::new(household_id, event_type, "test", json!({}))
    }

    #[tokio::test]
    async fn should_enqueue_one_job_per_action_slot() {
        let hh = HouseholdId::new();
        let r = rule(hh, "bill.due_soon", &["notify", "schedule_bill_reminders"]);
        let (dispatcher, _, queue) = dispatcher(vec![r.clone()]);
        let ev = event(hh, "bill.due_soon");

        let report = dispatcher.dispatch(&ev).await.unwrap();

        assert_eq!(report.rules_matched, 1);
        assert_eq!(report.jobs_created, 2);
        assert!(report.is_complete());
        let jobs = queue.all();
        assert_eq!(jobs[0].action, "notify");
        assert_eq!(jobs[1].action, "schedule_bill_reminders");
        assert_eq!(jobs[0].dedupe_key.to_string(), format!("{}:notify", ev.id));
        assert_eq!(
            jobs[1].dedupe_key,
            DedupeKey::for_event_action(ev.id, 0, "schedule_bill_reminders")
        );
        assert!(jobs.iter().all(|j| j.status == JobStatus::Pending
            && j.attempts == 0
            && j.max_attempts == 3
            && j.event_id == Some(ev.id)
            && j.rule_id == Some(r.id)));
    }

    #[tokio::test]
    async fn should_not_duplicate_jobs_when_event_is_redelivered() {
        let hh = HouseholdId::new();
        let (dispatcher, _, queue) = dispatcher(vec![rule(hh, "bill.due_soon", &["notify"])]);
        let ev = event(hh, "bill.due_soon");

        dispatcher.dispatch(&ev).await.unwrap();
        let second = dispatcher.dispatch(&ev).await.unwrap();

        assert_eq!(second.jobs_created, 0);
        assert_eq!(second.jobs_skipped_duplicate, 1);
        assert!(second.is_complete());
        assert_eq!(queue.all().len(), 1);
    }

    #[tokio::test]
    async fn should_keep_duplicate_action_names_in_separate_slots() {
        let hh = HouseholdId::new();
        let (dispatcher, _, queue) = dispatcher(vec![rule(hh, "chore.overdue", &["notify", "notify"])]);

        let report = dispatcher.dispatch(&event(hh, "chore.overdue")).await.unwrap();

        assert_eq!(report.jobs_created, 2);
        assert_eq!(queue.all().len(), 2);
    }

    #[tokio::test]
    async fn should_run_shared_action_once_across_matching_rules() {
        let hh = HouseholdId::new();
        let (dispatcher, _, queue) = dispatcher(vec![
            rule(hh, "bill.due_soon", &["notify"]),
            rule(hh, "bill.due_soon", &["schedule_bill_reminders", "notify"]),
        ]);
        let ev = event(hh, "bill.due_soon");

        let report = dispatcher.dispatch(&ev).await.unwrap();

        assert_eq!(report.rules_matched, 2);
        assert_eq!(report.jobs_created, 2);
        assert_eq!(report.jobs_skipped_duplicate, 1);
        assert!(report.is_complete());
        let keys: Vec<String> = queue.all().iter().map(|j| j.dedupe_key.to_string()).collect();
        assert_eq!(
            keys,
            vec![
                format!("{}:notify", ev.id),
                format!("{}:schedule_bill_reminders", ev.id),
            ]
        );
    }

    #[tokio::test]
    async fn should_ignore_disabled_rules_and_other_households() {
        let hh = HouseholdId::new();
        let disabled = Rule::builder()
            .household_id(hh)
            .name("off")
            .trigger("bill.due_soon")
            .action("notify", json!({"title": "t"}))
            .enabled(false)
            .build()
            .unwrap();
        let foreign = rule(HouseholdId::new(), "bill.due_soon", &["notify"]);
        let other_type = rule(hh, "bill.paid", &["notify"]);
        let (dispatcher, _, queue) = dispatcher(vec![disabled, foreign, other_type]);

        let report = dispatcher.dispatch(&event(hh, "bill.due_soon")).await.unwrap();

        assert_eq!(report.rules_matched, 0);
        assert_eq!(report.jobs_created, 0);
        assert!(queue.all().is_empty());
    }

    #[tokio::test]
    async fn should_match_trigger_strings_exactly() {
        let hh = HouseholdId::new();
        let (dispatcher, _, _) = dispatcher(vec![rule(hh, "bill.due_soon", &["notify"])]);

        let report = dispatcher.dispatch(&event(hh, "bill.due")).await.unwrap();

        assert_eq!(report.rules_matched, 0);
    }

    #[tokio::test]
    async fn should_report_enqueue_failures_and_continue() {
        let hh = HouseholdId::new();
        let r = rule(hh, "bill.due_soon", &["create_bill", "notify"]);
        let (dispatcher, _, queue) = dispatcher(vec![r.clone()]);
        queue.fail_enqueue_for("create_bill");

        let report = dispatcher.dispatch(&event(hh, "bill.due_soon")).await.unwrap();

        assert_eq!(report.jobs_created, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].rule_id, r.id);
        assert_eq!(report.errors[0].slot, 0);
        assert_eq!(report.errors[0].action, "create_bill");
        assert!(report.errors[0].message.contains("disk I/O error"));
        assert_eq!(queue.all()[0].action, "notify");
    }

    #[tokio::test]
    async fn should_propagate_rule_query_failure() {
        let hh = HouseholdId::new();
        let (dispatcher, repo, queue) = dispatcher(vec![rule(hh, "bill.due_soon", &["notify"])]);
        repo.break_queries();

        let result = dispatcher.dispatch(&event(hh, "bill.due_soon")).await;

        assert!(matches!(result, Err(HearthError::Storage(_))));
        assert!(queue.all().is_empty());
    }

    #[tokio::test]
    async fn should_stamp_max_attempts_from_retry_policy() {
        let hh = HouseholdId::new();
        let repo = InMemoryRules::with(vec![rule(hh, "bill.due_soon", &["notify"])]);
        let queue = Arc::new(InMemoryJobQueue::default());
        let dispatcher = EventDispatcher::new(repo, Arc::clone(&queue), &RetryPolicy::immediate(5));

        dispatcher.dispatch(&event(hh, "bill.due_soon")).await.unwrap();

        assert_eq!(queue.all()[0].max_attempts, 5);
    }
}

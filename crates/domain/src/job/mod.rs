//! Job: one scheduled unit of work for an `(event, action)` pair.
//!
//! Retries are modelled as row mutations rather than redelivery: a failed
//! job goes back to `pending` with a later `scheduled_for` until its attempts
//! are exhausted. The transition methods below are the reference semantics;
//! storage adapters implement the same transitions as conditional updates.

mod dedupe;
mod retry;
mod status;

pub use dedupe::DedupeKey;
pub use retry::RetryPolicy;
pub use status::{JobStatus, UnknownJobStatus};

use serde::{Deserialize, Serialize};

use crate::event::DomainEvent;
use crate::id::{EventId, HouseholdId, JobId, RuleId};
use crate::rule::{ActionSpec, Rule};
use crate::time::Timestamp;

/// Error recorded when a worker lost its claim on a job.
pub const STALE_CLAIM_ERROR: &str = "claim expired while processing";

/// A persisted job with its retry state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub dedupe_key: DedupeKey,
    pub household_id: HouseholdId,
    /// `None` for manually triggered jobs.
    pub rule_id: Option<RuleId>,
    /// `None` for manually triggered jobs.
    pub event_id: Option<EventId>,
    pub action: String,
    pub params: serde_json::Value,
    pub status: JobStatus,
    /// Executions started so far. Incremented when the job is claimed.
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    /// Earliest time the job may be claimed; `None` means immediately.
    pub scheduled_for: Option<Timestamp>,
    pub claimed_at: Option<Timestamp>,
    pub processed_at: Option<Timestamp>,
}

impl Job {
    /// Whether a worker may claim this job at `now`.
    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == JobStatus::Pending && self.scheduled_for.is_none_or(|at| at <= now)
    }

    /// Whether another execution is allowed after a failure.
    #[must_use]
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Whether the claim that set `attempts` to `attempt` is still current.
    ///
    /// Every claim bumps `attempts`, so a worker whose claim was released
    /// and taken over by another worker no longer matches.
    #[must_use]
    pub fn holds_claim(&self, attempt: u32) -> bool {
        self.status == JobStatus::Processing && self.attempts == attempt
    }

    /// `pending → processing`, counting the attempt.
    pub fn claim(&mut self, now: Timestamp) {
        self.status = JobStatus::Processing;
        self.attempts = self.attempts.saturating_add(1).min(self.max_attempts);
        self.claimed_at = Some(now);
    }

    /// `processing → completed`.
    pub fn complete(&mut self, now: Timestamp) {
        self.status = JobStatus::Completed;
        self.processed_at = Some(now);
    }

    /// `processing → pending (retry) | failed`.
    ///
    /// The job is retried only when `retry_at` is given and attempts remain;
    /// otherwise it fails permanently. Returns the new status.
    pub fn fail(&mut self, error: &str, retry_at: Option<Timestamp>, now: Timestamp) -> JobStatus {
        self.last_error = Some(error.to_string());
        match retry_at {
            Some(at) if self.has_attempts_left() => {
                self.status = JobStatus::Pending;
                self.scheduled_for = Some(at);
                self.claimed_at = None;
            }
            _ => {
                self.status = JobStatus::Failed;
                self.processed_at = Some(now);
            }
        }
        self.status
    }

    /// Release a claim whose worker disappeared.
    pub fn reclaim(&mut self, now: Timestamp) -> JobStatus {
        self.fail(STALE_CLAIM_ERROR, Some(now), now)
    }
}

/// A job about to be enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub id: JobId,
    pub dedupe_key: DedupeKey,
    pub household_id: HouseholdId,
    pub rule_id: Option<RuleId>,
    pub event_id: Option<EventId>,
    pub action: String,
    pub params: serde_json::Value,
    pub max_attempts: u32,
    pub scheduled_for: Option<Timestamp>,
}

impl NewJob {
    /// Job for the `slot`-th action of `rule`, fired by `event`.
    ///
    /// The dedupe key only depends on the event and the action name, plus
    /// how many times the name already appears before `slot` in this rule.
    #[must_use]
    pub fn for_rule_action(
        event: &DomainEvent,
        rule: &Rule,
        slot: usize,
        action: &ActionSpec,
        max_attempts: u32,
    ) -> Self {
        let occurrence = rule
            .actions
            .iter()
            .take(slot)
            .filter(|earlier| earlier.name == action.name)
            .count();
        Self {
            id: JobId::new(),
            dedupe_key: DedupeKey::for_event_action(event.id, occurrence, &action.name),
            household_id: event.household_id,
            rule_id: Some(rule.id),
            event_id: Some(event.id),
            action: action.name.clone(),
            params: action.params.clone(),
            max_attempts,
            scheduled_for: None,
        }
    }

    /// Job triggered by an operator, outside any rule or event.
    #[must_use]
    pub fn manual(
        household_id: HouseholdId,
        action: impl Into<String>,
        params: serde_json::Value,
        max_attempts: u32,
    ) -> Self {
        let id = JobId::new();
        Self {
            id,
            dedupe_key: DedupeKey::manual(id),
            household_id,
            rule_id: None,
            event_id: None,
            action: action.into(),
            params,
            max_attempts,
            scheduled_for: None,
        }
    }

    /// Materialize the pending job row.
    #[must_use]
    pub fn into_job(self, created_at: Timestamp) -> Job {
        Job {
            id: self.id,
            dedupe_key: self.dedupe_key,
            household_id: self.household_id,
            rule_id: self.rule_id,
            event_id: self.event_id,
            action: self.action,
            params: self.params,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: self.max_attempts,
            last_error: None,
            created_at,
            scheduled_for: self.scheduled_for,
            claimed_at: None,
            processed_at: None,
        }
    }
}

//! In-memory port implementations shared by the unit tests.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use hearth_domain::bill::{Bill, BillStatus};
use hearth_domain::error::{HearthError, NotFoundError};
use hearth_domain::event::DomainEvent;
use hearth_domain::id::{BillId, EventId, HouseholdId, JobId, RuleId};
use hearth_domain::job::{Job, JobStatus, NewJob};
use hearth_domain::notification::Notification;
use hearth_domain::reminder::Reminder;
use hearth_domain::rule::Rule;
use hearth_domain::time::{Date, Timestamp, now};

use crate::ports::{
    BillRepository, EnqueueOutcome, EventStore, JobFilter, JobQueue, Notifier, ReclaimReport,
    ReminderRepository, RuleRepository,
};

fn not_found(entity: &'static str, id: impl ToString) -> HearthError {
    NotFoundError {
        entity,
        id: id.to_string(),
    }
    .into()
}

fn io_error() -> HearthError {
    HearthError::Storage("disk I/O error".into())
}

#[derive(Default)]
pub struct InMemoryRules {
    rules: Mutex<Vec<Rule>>,
    broken: AtomicBool,
}

impl InMemoryRules {
    pub fn with(rules: impl IntoIterator<Item = Rule>) -> Self {
        let repo = Self::default();
        repo.rules.lock().unwrap().extend(rules);
        repo
    }

    /// Make every subsequent lookup fail.
    pub fn break_queries(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }
}

impl RuleRepository for InMemoryRules {
    fn find_enabled_for_event(
        &self,
        household_id: HouseholdId,
        event_type: &str,
    ) -> impl Future<Output = Result<Vec<Rule>, HearthError>> + Send {
        let result = if self.broken.load(Ordering::SeqCst) {
            Err(io_error())
        } else {
            let mut rules: Vec<Rule> = self
                .rules
                .lock()
                .unwrap()
                .iter()
                .filter(|r| {
                    r.enabled
                        && r.household_id == household_id
                        && r.triggers.iter().any(|t| t == event_type)
                })
                .cloned()
                .collect();
            rules.sort_by_key(|r| r.created_at);
            Ok(rules)
        };
        async { result }
    }

    fn create(&self, rule: Rule) -> impl Future<Output = Result<Rule, HearthError>> + Send {
        self.rules.lock().unwrap().push(rule.clone());
        async { Ok(rule) }
    }

    fn get_by_id(
        &self,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<Rule>, HearthError>> + Send {
        let result = self.rules.lock().unwrap().iter().find(|r| r.id == id).cloned();
        async { Ok(result) }
    }

    fn list_for_household(
        &self,
        household_id: HouseholdId,
    ) -> impl Future<Output = Result<Vec<Rule>, HearthError>> + Send {
        let result: Vec<Rule> = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.household_id == household_id)
            .cloned()
            .collect();
        async { Ok(result) }
    }

    fn update(&self, rule: Rule) -> impl Future<Output = Result<Rule, HearthError>> + Send {
        let mut rules = self.rules.lock().unwrap();
        let result = match rules.iter_mut().find(|r| r.id == rule.id) {
            Some(slot) => {
                *slot = rule.clone();
                Ok(rule)
            }
            None => Err(not_found("Rule", rule.id)),
        };
        async { result }
    }

    fn delete(&self, id: RuleId) -> impl Future<Output = Result<(), HearthError>> + Send {
        let mut rules = self.rules.lock().unwrap();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        let result = if rules.len() == before {
            Err(not_found("Rule", id))
        } else {
            Ok(())
        };
        async { result }
    }
}

#[derive(Default)]
pub struct InMemoryJobQueue {
    jobs: Mutex<Vec<Job>>,
    failing_actions: Mutex<HashSet<String>>,
}

impl InMemoryJobQueue {
    pub fn all(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned()
    }

    /// Replace a stored job, e.g. to age its claim.
    pub fn put(&self, job: Job) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(slot) = jobs.iter_mut().find(|j| j.id == job.id) {
            *slot = job;
        }
    }

    /// Make enqueueing jobs for `action` fail with a storage error.
    pub fn fail_enqueue_for(&self, action: &str) {
        self.failing_actions
            .lock()
            .unwrap()
            .insert(action.to_string());
    }

    /// Apply `f` if the claim identified by `attempt` is still held.
    fn settle(
        &self,
        id: JobId,
        attempt: u32,
        f: impl FnOnce(&mut Job) -> JobStatus,
    ) -> Result<Option<JobStatus>, HearthError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| not_found("Job", id))?;
        Ok(job.holds_claim(attempt).then(|| f(job)))
    }
}

impl JobQueue for InMemoryJobQueue {
    fn enqueue(
        &self,
        job: NewJob,
    ) -> impl Future<Output = Result<EnqueueOutcome, HearthError>> + Send {
        let result = if self.failing_actions.lock().unwrap().contains(&job.action) {
            Err(io_error())
        } else {
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.iter().any(|j| j.dedupe_key == job.dedupe_key) {
                Ok(EnqueueOutcome::Duplicate)
            } else {
                let job = job.into_job(now());
                jobs.push(job.clone());
                Ok(EnqueueOutcome::Created(job))
            }
        };
        async { result }
    }

    fn claim_next_pending(
        &self,
        limit: usize,
        now: Timestamp,
    ) -> impl Future<Output = Result<Vec<Job>, HearthError>> + Send {
        let mut jobs = self.jobs.lock().unwrap();
        let claimed: Vec<Job> = jobs
            .iter_mut()
            .filter(|j| j.is_due(now))
            .take(limit)
            .map(|j| {
                j.claim(now);
                j.clone()
            })
            .collect();
        async { Ok(claimed) }
    }

    fn mark_completed(
        &self,
        id: JobId,
        attempt: u32,
        now: Timestamp,
    ) -> impl Future<Output = Result<bool, HearthError>> + Send {
        let result = self
            .settle(id, attempt, |job| {
                job.complete(now);
                job.status
            })
            .map(|status| status.is_some());
        async { result }
    }

    fn mark_failed_and_maybe_retry(
        &self,
        id: JobId,
        attempt: u32,
        error: &str,
        retry_at: Option<Timestamp>,
        now: Timestamp,
    ) -> impl Future<Output = Result<Option<JobStatus>, HearthError>> + Send {
        let result = self.settle(id, attempt, |job| job.fail(error, retry_at, now));
        async { result }
    }

    fn reclaim_stale(
        &self,
        claimed_before: Timestamp,
        now: Timestamp,
    ) -> impl Future<Output = Result<ReclaimReport, HearthError>> + Send {
        let mut report = ReclaimReport::default();
        for job in self.jobs.lock().unwrap().iter_mut().filter(|j| {
            j.status == JobStatus::Processing && j.claimed_at.is_some_and(|at| at < claimed_before)
        }) {
            match job.reclaim(now) {
                JobStatus::Pending => report.requeued += 1,
                _ => report.failed += 1,
            }
        }
        async move { Ok(report) }
    }

    fn get_by_id(
        &self,
        id: JobId,
    ) -> impl Future<Output = Result<Option<Job>, HearthError>> + Send {
        let result = self.get(id);
        async { Ok(result) }
    }

    fn list(&self, filter: JobFilter) -> impl Future<Output = Result<Vec<Job>, HearthError>> + Send {
        let mut result: Vec<Job> = self
            .all()
            .into_iter()
            .rev()
            .filter(|j| filter.household_id.is_none_or(|hh| j.household_id == hh))
            .filter(|j| filter.status.is_none_or(|s| j.status == s))
            .collect();
        if let Some(limit) = filter.limit {
            result.truncate(limit as usize);
        }
        async { Ok(result) }
    }
}

#[derive(Default)]
pub struct InMemoryEvents {
    events: Mutex<Vec<DomainEvent>>,
}

impl EventStore for InMemoryEvents {
    fn store(
        &self,
        event: DomainEvent,
    ) -> impl Future<Output = Result<DomainEvent, HearthError>> + Send {
        let mut events = self.events.lock().unwrap();
        let stored = match events.iter().find(|e| e.id == event.id) {
            Some(existing) => existing.clone(),
            None => {
                events.push(event.clone());
                event
            }
        };
        async { Ok(stored) }
    }

    fn get_by_id(
        &self,
        id: EventId,
    ) -> impl Future<Output = Result<Option<DomainEvent>, HearthError>> + Send {
        let result = self.events.lock().unwrap().iter().find(|e| e.id == id).cloned();
        async { Ok(result) }
    }

    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DomainEvent>, HearthError>> + Send {
        let result: Vec<DomainEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect();
        async { Ok(result) }
    }
}

#[derive(Default)]
pub struct InMemoryBills {
    bills: Mutex<Vec<Bill>>,
}

impl InMemoryBills {
    pub fn all(&self) -> Vec<Bill> {
        self.bills.lock().unwrap().clone()
    }

    pub fn get(&self, id: BillId) -> Option<Bill> {
        self.bills.lock().unwrap().iter().find(|b| b.id == id).cloned()
    }

    pub fn insert(&self, bill: Bill) {
        self.bills.lock().unwrap().push(bill);
    }
}

impl BillRepository for InMemoryBills {
    fn create_for_job(&self, bill: Bill) -> impl Future<Output = Result<Bill, HearthError>> + Send {
        let mut bills = self.bills.lock().unwrap();
        let existing = bill
            .created_by_job
            .and_then(|job| bills.iter().find(|b| b.created_by_job == Some(job)).cloned());
        let stored = existing.unwrap_or_else(|| {
            bills.push(bill.clone());
            bill
        });
        async { Ok(stored) }
    }

    fn get_by_id(
        &self,
        id: BillId,
    ) -> impl Future<Output = Result<Option<Bill>, HearthError>> + Send {
        let result = self.get(id);
        async { Ok(result) }
    }

    fn list_unpaid_due_by(
        &self,
        household_id: HouseholdId,
        due_by: Date,
    ) -> impl Future<Output = Result<Vec<Bill>, HearthError>> + Send {
        let mut result: Vec<Bill> = self
            .all()
            .into_iter()
            .filter(|b| {
                b.household_id == household_id
                    && b.status == BillStatus::Unpaid
                    && b.due_date <= due_by
            })
            .collect();
        result.sort_by_key(|b| b.due_date);
        async { Ok(result) }
    }

    fn mark_overdue(
        &self,
        household_id: HouseholdId,
        today: Date,
    ) -> impl Future<Output = Result<u64, HearthError>> + Send {
        let mut marked = 0;
        for bill in self.bills.lock().unwrap().iter_mut().filter(|b| {
            b.household_id == household_id && b.status == BillStatus::Unpaid && b.is_past_due(today)
        }) {
            bill.status = BillStatus::Overdue;
            marked += 1;
        }
        async move { Ok(marked) }
    }
}

#[derive(Default)]
pub struct InMemoryReminders {
    reminders: Mutex<Vec<Reminder>>,
}

impl InMemoryReminders {
    pub fn all(&self) -> Vec<Reminder> {
        self.reminders.lock().unwrap().clone()
    }
}

impl ReminderRepository for InMemoryReminders {
    fn upsert(&self, reminder: Reminder) -> impl Future<Output = Result<bool, HearthError>> + Send {
        let mut reminders = self.reminders.lock().unwrap();
        let exists = reminders
            .iter()
            .any(|r| r.bill_id == reminder.bill_id && r.lead_days == reminder.lead_days);
        if !exists {
            reminders.push(reminder);
        }
        async move { Ok(!exists) }
    }

    fn list_for_bill(
        &self,
        bill_id: BillId,
    ) -> impl Future<Output = Result<Vec<Reminder>, HearthError>> + Send {
        let result: Vec<Reminder> = self
            .all()
            .into_iter()
            .filter(|r| r.bill_id == bill_id)
            .collect();
        async { Ok(result) }
    }
}

#[derive(Default)]
pub struct InMemoryNotifier {
    inbox: Mutex<Vec<Notification>>,
}

impl InMemoryNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.inbox.lock().unwrap().clone()
    }
}

impl Notifier for InMemoryNotifier {
    fn notify(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<bool, HearthError>> + Send {
        let mut inbox = self.inbox.lock().unwrap();
        let duplicate = notification
            .job_id
            .is_some_and(|job| inbox.iter().any(|n| n.job_id == Some(job)));
        if !duplicate {
            inbox.push(notification);
        }
        async move { Ok(!duplicate) }
    }

    fn list_for_household(
        &self,
        household_id: HouseholdId,
    ) -> impl Future<Output = Result<Vec<Notification>, HearthError>> + Send {
        let result: Vec<Notification> = self
            .all()
            .into_iter()
            .rev()
            .filter(|n| n.household_id == household_id)
            .collect();
        async { Ok(result) }
    }
}

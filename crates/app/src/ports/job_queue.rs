//! Job queue port: durable, deduplicated, claimable jobs.

use std::future::Future;
use std::sync::Arc;

use hearth_domain::error::HearthError;
use hearth_domain::id::{HouseholdId, JobId};
use hearth_domain::job::{Job, JobStatus, NewJob};
use hearth_domain::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Result of [`JobQueue::enqueue`].
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// The job was inserted as `pending`.
    Created(Job),
    /// A job with the same dedupe key already exists; nothing was written.
    Duplicate,
}

/// Filter for [`JobQueue::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilter {
    pub household_id: Option<HouseholdId>,
    pub status: Option<JobStatus>,
    pub limit: Option<u32>,
}

/// Counts returned by [`JobQueue::reclaim_stale`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReclaimReport {
    /// Jobs put back to `pending`.
    pub requeued: u64,
    /// Jobs whose attempts were exhausted, now `failed`.
    pub failed: u64,
}

impl ReclaimReport {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.requeued + self.failed
    }
}

/// Durable job queue.
///
/// Implementations must make [`claim_next_pending`](Self::claim_next_pending)
/// atomic: two concurrent callers never receive the same job.
pub trait JobQueue {
    /// Insert a pending job unless its dedupe key is already taken.
    fn enqueue(
        &self,
        job: NewJob,
    ) -> impl Future<Output = Result<EnqueueOutcome, HearthError>> + Send;

    /// Move up to `limit` due pending jobs to `processing`, oldest first.
    ///
    /// Each claimed job has `claimed_at = now` and its `attempts` incremented.
    fn claim_next_pending(
        &self,
        limit: usize,
        now: Timestamp,
    ) -> impl Future<Output = Result<Vec<Job>, HearthError>> + Send;

    /// `processing → completed`, for the claim that set `attempts` to
    /// `attempt`.
    ///
    /// Returns `false` without writing anything when that claim is no longer
    /// held: the job was released by the stale sweep and possibly claimed and
    /// finished by another worker since.
    fn mark_completed(
        &self,
        id: JobId,
        attempt: u32,
        now: Timestamp,
    ) -> impl Future<Output = Result<bool, HearthError>> + Send;

    /// Record a failure and either reschedule the job at `retry_at` or fail it
    /// permanently. Without `retry_at`, or once `attempts` has reached
    /// `max_attempts`, the job becomes `failed`. Returns the new status.
    ///
    /// Scoped to the claim that set `attempts` to `attempt`, like
    /// [`mark_completed`](Self::mark_completed); returns `None` when that
    /// claim is no longer held.
    fn mark_failed_and_maybe_retry(
        &self,
        id: JobId,
        attempt: u32,
        error: &str,
        retry_at: Option<Timestamp>,
        now: Timestamp,
    ) -> impl Future<Output = Result<Option<JobStatus>, HearthError>> + Send;

    /// Release `processing` jobs claimed before `claimed_before`.
    fn reclaim_stale(
        &self,
        claimed_before: Timestamp,
        now: Timestamp,
    ) -> impl Future<Output = Result<ReclaimReport, HearthError>> + Send;

    /// Get a job by its unique identifier.
    fn get_by_id(&self, id: JobId)
    -> impl Future<Output = Result<Option<Job>, HearthError>> + Send;

    /// Jobs matching `filter`, newest first.
    fn list(&self, filter: JobFilter) -> impl Future<Output = Result<Vec<Job>, HearthError>> + Send;
}

impl<T: JobQueue + Send + Sync> JobQueue for Arc<T> {
    fn enqueue(
        &self,
        job: NewJob,
    ) -> impl Future<Output = Result<EnqueueOutcome, HearthError>> + Send {
        (**self).enqueue(job)
    }

    fn claim_next_pending(
        &self,
        limit: usize,
        now: Timestamp,
    ) -> impl Future<Output = Result<Vec<Job>, HearthError>> + Send {
        (**self).claim_next_pending(limit, now)
    }

    fn mark_completed(
        &self,
        id: JobId,
        attempt: u32,
        now: Timestamp,
    ) -> impl Future<Output = Result<bool, HearthError>> + Send {
        (**self).mark_completed(id, attempt, now)
    }

    fn mark_failed_and_maybe_retry(
        &self,
        id: JobId,
        attempt: u32,
        error: &str,
        retry_at: Option<Timestamp>,
        now: Timestamp,
    ) -> impl Future<Output = Result<Option<JobStatus>, HearthError>> + Send {
        (**self).mark_failed_and_maybe_retry(id, attempt, error, retry_at, now)
    }

    fn reclaim_stale(
        &self,
        claimed_before: Timestamp,
        now: Timestamp,
    ) -> impl Future<Output = Result<ReclaimReport, HearthError>> + Send {
        (**self).reclaim_stale(claimed_before, now)
    }

    fn get_by_id(
        &self,
        id: JobId,
    ) -> impl Future<Output = Result<Option<Job>, HearthError>> + Send {
        (**self).get_by_id(id)
    }

    fn list(&self, filter: JobFilter) -> impl Future<Output = Result<Vec<Job>, HearthError>> + Send {
        (**self).list(filter)
    }
}

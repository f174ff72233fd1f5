//! Job service: inspecting jobs and triggering actions by hand.

use std::sync::Arc;

use hearth_domain::error::{HearthError, NotFoundError};
use hearth_domain::id::{HouseholdId, JobId};
use hearth_domain::job::{Job, NewJob};

use crate::actions::ActionRegistry;
use crate::ports::{EnqueueOutcome, JobFilter, JobQueue};

/// Largest page returned by [`JobService::list_jobs`].
pub const MAX_PAGE: u32 = 500;

pub struct JobService<Q> {
    queue: Q,
    registry: Arc<ActionRegistry>,
    max_attempts: u32,
}

impl<Q: JobQueue> JobService<Q> {
    pub fn new(queue: Q, registry: Arc<ActionRegistry>, max_attempts: u32) -> Self {
        Self {
            queue,
            registry,
            max_attempts,
        }
    }

    /// # Errors
    ///
    /// Returns [`HearthError::NotFound`] when no job with `id` exists,
    /// or a storage error from the queue.
    #[tracing::instrument(skip(self))]
    pub async fn get_job(&self, id: JobId) -> Result<Job, HearthError> {
        self.queue.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Job",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Jobs matching `filter`, newest first. Filtering on `failed` gives the
    /// list of jobs that need attention.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the queue.
    pub async fn list_jobs(&self, mut filter: JobFilter) -> Result<Vec<Job>, HearthError> {
        filter.limit = Some(filter.limit.unwrap_or(MAX_PAGE).min(MAX_PAGE));
        self.queue.list(filter).await
    }

    /// Enqueue a one-off job for `action`, outside any rule.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if the action is unknown or `params`
    /// do not fit it, or a storage error from the queue.
    #[tracing::instrument(skip(self, params))]
    pub async fn trigger(
        &self,
        household_id: HouseholdId,
        action: &str,
        params: serde_json::Value,
    ) -> Result<Job, HearthError> {
        self.registry
            .validate_params(action, &params)
            .map_err(|err| err.into_validation(action))?;

        let job = NewJob::manual(household_id, action, params, self.max_attempts);
        let id = job.id;
        match self.queue.enqueue(job).await? {
            EnqueueOutcome::Created(job) => {
                tracing::info!(job_id = %job.id, "manual job enqueued");
                Ok(job)
            }
            EnqueueOutcome::Duplicate => self.get_job(id).await,
        }
    }
}

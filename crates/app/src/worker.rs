//! Worker: claims due jobs and runs their actions.
//!
//! Each [`Worker::run_once`] call sweeps stale claims, claims a batch of due
//! jobs, and runs them one after another. Every handler runs in its own task
//! under a timeout, so a panicking or hung handler only fails its own job.
//! Outcomes are written back to the queue:
//!
//! - success → `completed`
//! - transient failure → `pending` again at `now + backoff(attempts)`, until
//!   `max_attempts` is reached, then `failed`
//! - permanent failure (unknown action, invalid params) → `failed`
//!
//! An outcome is only written while the worker still holds its claim. If the
//! stale sweep released the job in the meantime, the outcome is dropped and
//! counted as `superseded`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use hearth_domain::error::HearthError;
use hearth_domain::job::{Job, JobStatus, RetryPolicy};
use hearth_domain::time::{self, Timestamp};
use serde::Serialize;
use tokio::task::JoinError;
use tokio::time::MissedTickBehavior;

use crate::actions::{ActionContext, ActionError, ActionRegistry, ActionResult, error_chain};
use crate::ports::{JobQueue, ReclaimReport};

/// Tunables for a [`Worker`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Jobs claimed per tick of [`Worker::run`].
    pub batch_size: usize,
    /// Limit for actions that do not declare their own timeout.
    pub action_timeout: Duration,
    /// How long a job may stay `processing` before its claim is released.
    pub stale_after: Duration,
    pub retry: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            action_timeout: Duration::from_secs(30),
            stale_after: Duration::from_secs(15 * 60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Counts for one [`Worker::run_once`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub reclaimed: ReclaimReport,
    pub claimed: usize,
    pub completed: usize,
    pub retried: usize,
    pub failed: usize,
    /// Outcomes dropped because the claim had been released.
    pub superseded: usize,
}

impl WorkerReport {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.claimed == 0 && self.reclaimed.total() == 0
    }
}

pub struct Worker<Q> {
    queue: Q,
    registry: Arc<ActionRegistry>,
    config: WorkerConfig,
}

impl<Q: JobQueue> Worker<Q> {
    pub fn new(queue: Q, registry: Arc<ActionRegistry>, config: WorkerConfig) -> Self {
        Self {
            queue,
            registry,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Process at most `batch_size` due jobs.
    ///
    /// Handler failures are recorded on their jobs, never returned.
    ///
    /// # Errors
    ///
    /// Returns the queue's error if the stale sweep or the claim fails.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self, batch_size: usize) -> Result<WorkerReport, HearthError> {
        let now = time::now();
        let mut report = WorkerReport::default();

        let stale_before = TimeDelta::from_std(self.config.stale_after)
            .ok()
            .and_then(|age| now.checked_sub_signed(age));
        if let Some(before) = stale_before {
            report.reclaimed = self.queue.reclaim_stale(before, now).await?;
            if report.reclaimed.total() > 0 {
                tracing::warn!(
                    requeued = report.reclaimed.requeued,
                    failed = report.reclaimed.failed,
                    "released stale job claims"
                );
            }
        }

        let jobs = self.queue.claim_next_pending(batch_size, now).await?;
        report.claimed = jobs.len();

        for job in jobs {
            match self.process(&job).await {
                Ok(Some(JobStatus::Completed)) => report.completed += 1,
                Ok(Some(JobStatus::Pending)) => report.retried += 1,
                Ok(Some(JobStatus::Failed)) => report.failed += 1,
                Ok(None) => report.superseded += 1,
                Ok(Some(JobStatus::Processing)) => {
                    tracing::warn!(job_id = %job.id, "job left in processing");
                }
                Err(err) => {
                    // The stale sweep will pick the job up again.
                    tracing::error!(
                        job_id = %job.id,
                        error = %error_chain(&err),
                        "failed to record job outcome"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Call [`run_once`](Self::run_once) every `interval` until `shutdown`
    /// resolves. A batch in progress is finished before returning.
    pub async fn run(&self, interval: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(?interval, batch_size = self.config.batch_size, "worker started");
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => match self.run_once(self.config.batch_size).await {
                    Ok(report) if report.is_idle() => {}
                    Ok(report) => tracing::info!(?report, "worker batch finished"),
                    Err(err) => tracing::error!(error = %error_chain(&err), "worker batch failed"),
                },
            }
        }
        tracing::info!("worker stopped");
    }

    /// Run `job` and record its outcome. `None` when the claim was lost.
    async fn process(&self, job: &Job) -> Result<Option<JobStatus>, HearthError> {
        let outcome = self.execute(job).await;
        let now = time::now();
        match outcome {
            Ok(result) if result.success => {
                if !self.queue.mark_completed(job.id, job.attempts, now).await? {
                    return Ok(None);
                }
                tracing::info!(
                    job_id = %job.id,
                    action = %job.action,
                    attempt = job.attempts,
                    message = %result.message,
                    "job completed"
                );
                Ok(Some(JobStatus::Completed))
            }
            Ok(result) => self.record_failure(job, &result.message, true, now).await,
            Err(err) => {
                let retryable = !err.is_permanent();
                self.record_failure(job, &error_chain(&err), retryable, now)
                    .await
            }
        }
    }

    async fn execute(&self, job: &Job) -> Result<ActionResult, ActionError> {
        let handler = self.registry.handler(&job.action)?;
        handler.validate_params(&job.params)?;

        let limit = handler
            .timeout()
            .unwrap_or(self.config.action_timeout)
            .min(self.claim_budget(job));
        let ctx = ActionContext::for_job(job);
        let mut task = tokio::spawn(async move { handler.invoke(ctx).await });

        match tokio::time::timeout(limit, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ActionError::Panicked(panic_message(join_error))),
            Err(_elapsed) => {
                task.abort();
                Err(ActionError::TimedOut(limit))
            }
        }
    }

    /// Time left before the stale sweep may release `job`'s claim.
    fn claim_budget(&self, job: &Job) -> Duration {
        let elapsed = job
            .claimed_at
            .and_then(|at| (time::now() - at).to_std().ok())
            .unwrap_or_default();
        self.config.stale_after.saturating_sub(elapsed)
    }

    async fn record_failure(
        &self,
        job: &Job,
        error: &str,
        retryable: bool,
        now: Timestamp,
    ) -> Result<Option<JobStatus>, HearthError> {
        let retry_at = retryable.then(|| self.config.retry.retry_at(now, job.attempts));
        let Some(status) = self
            .queue
            .mark_failed_and_maybe_retry(job.id, job.attempts, error, retry_at, now)
            .await?
        else {
            return Ok(None);
        };

        if status == JobStatus::Pending {
            tracing::warn!(
                job_id = %job.id,
                action = %job.action,
                attempt = job.attempts,
                max_attempts = job.max_attempts,
                ?retry_at,
                error,
                "job failed, retry scheduled"
            );
        } else {
            tracing::error!(
                job_id = %job.id,
                action = %job.action,
                attempt = job.attempts,
                error,
                "job failed permanently"
            );
        }
        Ok(Some(status))
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string()),
        Err(err) => err.to_string(),
    }
}

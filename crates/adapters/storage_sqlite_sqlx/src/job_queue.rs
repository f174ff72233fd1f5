//! `SQLite` implementation of [`JobQueue`].
//!
//! Every state transition is a single conditional `UPDATE`, so concurrent
//! workers sharing the database never claim the same job and the attempt
//! bound holds regardless of what callers pass in. Outcomes are written only
//! while the reporting worker's claim (`status = 'processing'` at the
//! `attempts` it claimed) still holds, so a late report from a released
//! claim never touches the job again.

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hearth_app::ports::{EnqueueOutcome, JobFilter, JobQueue, ReclaimReport};
use hearth_domain::error::{HearthError, NotFoundError};
use hearth_domain::id::{EventId, HouseholdId, JobId, RuleId};
use hearth_domain::job::{DedupeKey, Job, JobStatus, NewJob, STALE_CLAIM_ERROR};
use hearth_domain::time::{Timestamp, now};

use crate::codec;
use crate::error::StorageError;

struct Wrapper(Job);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Job> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let household_id: uuid::Uuid = row.try_get("household_id")?;
        let rule_id: Option<uuid::Uuid> = row.try_get("rule_id")?;
        let event_id: Option<uuid::Uuid> = row.try_get("event_id")?;
        let dedupe_key: String = row.try_get("dedupe_key")?;
        let params: String = row.try_get("params")?;
        let status: String = row.try_get("status")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Self(Job {
            id: JobId::from_uuid(id),
            dedupe_key: DedupeKey::from_raw(dedupe_key),
            household_id: HouseholdId::from_uuid(household_id),
            rule_id: rule_id.map(RuleId::from_uuid),
            event_id: event_id.map(EventId::from_uuid),
            action: row.try_get("action")?,
            params: codec::parse_json(&params)?,
            status: JobStatus::from_str(&status).map_err(codec::decode_error)?,
            attempts: row.try_get("attempts")?,
            max_attempts: row.try_get("max_attempts")?,
            last_error: row.try_get("last_error")?,
            created_at: codec::parse_timestamp(&created_at)?,
            scheduled_for: codec::parse_optional_timestamp(row.try_get("scheduled_for")?)?,
            claimed_at: codec::parse_optional_timestamp(row.try_get("claimed_at")?)?,
            processed_at: codec::parse_optional_timestamp(row.try_get("processed_at")?)?,
        }))
    }
}

/// A claimed job with its insertion sequence, used to restore claim order.
struct Claimed {
    seq: i64,
    job: Job,
}

impl<'r> FromRow<'r, SqliteRow> for Claimed {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            seq: row.try_get("seq")?,
            job: Wrapper::from_row(row)?.0,
        })
    }
}

const INSERT: &str = r"
    INSERT INTO jobs (
        id, dedupe_key, household_id, rule_id, event_id, action, params,
        status, attempts, max_attempts, created_at, scheduled_for
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', 0, ?, ?, ?)
    ON CONFLICT (dedupe_key) DO NOTHING
";

const CLAIM: &str = r"
    UPDATE jobs
    SET status = 'processing', attempts = attempts + 1, claimed_at = ?
    WHERE id IN (
        SELECT id FROM jobs
        WHERE status = 'pending'
          AND attempts < max_attempts
          AND (scheduled_for IS NULL OR scheduled_for <= ?)
        ORDER BY created_at, rowid
        LIMIT ?
    )
    RETURNING *, rowid AS seq
";

const COMPLETE: &str = r"
    UPDATE jobs
    SET status = 'completed', processed_at = ?
    WHERE id = ? AND status = 'processing' AND attempts = ?
";

// Binds: error, retry_at (x5), now, id, attempt.
const FAIL: &str = r"
    UPDATE jobs
    SET last_error = ?,
        status = CASE WHEN ? IS NOT NULL AND attempts < max_attempts
                      THEN 'pending' ELSE 'failed' END,
        scheduled_for = CASE WHEN ? IS NOT NULL AND attempts < max_attempts
                             THEN ? ELSE scheduled_for END,
        claimed_at = CASE WHEN ? IS NOT NULL AND attempts < max_attempts
                          THEN NULL ELSE claimed_at END,
        processed_at = CASE WHEN ? IS NOT NULL AND attempts < max_attempts
                            THEN NULL ELSE ? END
    WHERE id = ? AND status = 'processing' AND attempts = ?
    RETURNING status
";

// Binds: error, now (x2), claimed_before.
const RECLAIM: &str = r"
    UPDATE jobs
    SET last_error = ?,
        status = CASE WHEN attempts < max_attempts THEN 'pending' ELSE 'failed' END,
        scheduled_for = CASE WHEN attempts < max_attempts THEN ? ELSE scheduled_for END,
        claimed_at = CASE WHEN attempts < max_attempts THEN NULL ELSE claimed_at END,
        processed_at = CASE WHEN attempts < max_attempts THEN NULL ELSE ? END
    WHERE status = 'processing' AND claimed_at < ?
    RETURNING status
";

const SELECT_BY_ID: &str = "SELECT * FROM jobs WHERE id = ?";
const EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM jobs WHERE id = ?)";

const SELECT_FILTERED: &str = r"
    SELECT * FROM jobs
    WHERE (? IS NULL OR household_id = ?)
      AND (? IS NULL OR status = ?)
    ORDER BY created_at DESC, rowid DESC
    LIMIT ?
";

/// `SQLite`-backed job queue.
pub struct SqliteJobQueue {
    pool: SqlitePool,
}

impl SqliteJobQueue {
    /// Create a new queue backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: JobId) -> Result<bool, HearthError> {
        let (exists,): (bool,) = sqlx::query_as(EXISTS)
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(exists)
    }
}

fn not_found(id: JobId) -> HearthError {
    NotFoundError {
        entity: "Job",
        id: id.to_string(),
    }
    .into()
}

fn parse_status(raw: &str) -> Result<JobStatus, HearthError> {
    JobStatus::from_str(raw)
        .map_err(|err| StorageError::Decode(Box::new(err)))
        .map_err(HearthError::from)
}

impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, job: NewJob) -> Result<EnqueueOutcome, HearthError> {
        let params = serde_json::to_string(&job.params).map_err(StorageError::from)?;
        let created_at = now();

        let result = sqlx::query(INSERT)
            .bind(job.id.as_uuid())
            .bind(job.dedupe_key.as_str())
            .bind(job.household_id.as_uuid())
            .bind(job.rule_id.map(RuleId::as_uuid))
            .bind(job.event_id.map(EventId::as_uuid))
            .bind(&job.action)
            .bind(&params)
            .bind(job.max_attempts)
            .bind(codec::timestamp(created_at))
            .bind(job.scheduled_for.map(codec::timestamp))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Ok(EnqueueOutcome::Duplicate);
        }
        Ok(EnqueueOutcome::Created(job.into_job(created_at)))
    }

    async fn claim_next_pending(
        &self,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<Job>, HearthError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let now = codec::timestamp(now);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut claimed: Vec<Claimed> = sqlx::query_as(CLAIM)
            .bind(&now)
            .bind(&now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        // RETURNING yields rows in no particular order.
        claimed.sort_by(|a, b| {
            a.job
                .created_at
                .cmp(&b.job.created_at)
                .then(a.seq.cmp(&b.seq))
        });
        Ok(claimed.into_iter().map(|c| c.job).collect())
    }

    async fn mark_completed(
        &self,
        id: JobId,
        attempt: u32,
        now: Timestamp,
    ) -> Result<bool, HearthError> {
        let result = sqlx::query(COMPLETE)
            .bind(codec::timestamp(now))
            .bind(id.as_uuid())
            .bind(attempt)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            if !self.exists(id).await? {
                return Err(not_found(id));
            }
            tracing::warn!(job_id = %id, attempt, "claim no longer held, completion ignored");
            return Ok(false);
        }
        Ok(true)
    }

    async fn mark_failed_and_maybe_retry(
        &self,
        id: JobId,
        attempt: u32,
        error: &str,
        retry_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<Option<JobStatus>, HearthError> {
        let retry_at = retry_at.map(codec::timestamp);
        let row: Option<(String,)> = sqlx::query_as(FAIL)
            .bind(error)
            .bind(&retry_at)
            .bind(&retry_at)
            .bind(&retry_at)
            .bind(&retry_at)
            .bind(&retry_at)
            .bind(codec::timestamp(now))
            .bind(id.as_uuid())
            .bind(attempt)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        match row {
            Some((status,)) => parse_status(&status).map(Some),
            None if self.exists(id).await? => {
                tracing::warn!(job_id = %id, attempt, "claim no longer held, failure ignored");
                Ok(None)
            }
            None => Err(not_found(id)),
        }
    }

    async fn reclaim_stale(
        &self,
        claimed_before: Timestamp,
        now: Timestamp,
    ) -> Result<ReclaimReport, HearthError> {
        let now = codec::timestamp(now);
        let rows: Vec<(String,)> = sqlx::query_as(RECLAIM)
            .bind(STALE_CLAIM_ERROR)
            .bind(&now)
            .bind(&now)
            .bind(codec::timestamp(claimed_before))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let mut report = ReclaimReport::default();
        for (status,) in rows {
            match parse_status(&status)? {
                JobStatus::Pending => report.requeued += 1,
                _ => report.failed += 1,
            }
        }
        Ok(report)
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, HearthError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>, HearthError> {
        let household = filter.household_id.map(HouseholdId::as_uuid);
        let status = filter.status.map(JobStatus::as_str);

        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_FILTERED)
            .bind(household)
            .bind(household)
            .bind(status)
            .bind(status)
            .bind(codec::limit(filter.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

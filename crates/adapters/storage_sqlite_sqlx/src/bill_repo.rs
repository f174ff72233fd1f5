//! `SQLite` implementation of [`BillRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hearth_app::ports::BillRepository;
use hearth_domain::bill::{Bill, BillStatus};
use hearth_domain::error::HearthError;
use hearth_domain::id::{BillId, HouseholdId, JobId};
use hearth_domain::time::Date;

use crate::codec;
use crate::error::StorageError;

struct Wrapper(Bill);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Bill> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let household_id: uuid::Uuid = row.try_get("household_id")?;
        let created_by_job: Option<uuid::Uuid> = row.try_get("created_by_job")?;
        let due_date: String = row.try_get("due_date")?;
        let status: String = row.try_get("status")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Self(Bill {
            id: BillId::from_uuid(id),
            household_id: HouseholdId::from_uuid(household_id),
            title: row.try_get("title")?,
            amount_cents: row.try_get("amount_cents")?,
            currency: row.try_get("currency")?,
            due_date: codec::parse_date(&due_date)?,
            status: BillStatus::from_str(&status).map_err(codec::decode_error)?,
            created_by_job: created_by_job.map(JobId::from_uuid),
            created_at: codec::parse_timestamp(&created_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO bills (id, household_id, title, amount_cents, currency, due_date, status, created_by_job, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (created_by_job) DO NOTHING
";

const SELECT_BY_ID: &str = "SELECT * FROM bills WHERE id = ?";
const SELECT_BY_JOB: &str = "SELECT * FROM bills WHERE created_by_job = ?";

const SELECT_UNPAID_DUE_BY: &str = r"
    SELECT * FROM bills
    WHERE household_id = ? AND status = 'unpaid' AND due_date <= ?
    ORDER BY due_date, rowid
";

const MARK_OVERDUE: &str = r"
    UPDATE bills SET status = 'overdue'
    WHERE household_id = ? AND status = 'unpaid' AND due_date < ?
";

/// `SQLite`-backed bill repository.
pub struct SqliteBillRepository {
    pool: SqlitePool,
}

impl SqliteBillRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl BillRepository for SqliteBillRepository {
    async fn create_for_job(&self, bill: Bill) -> Result<Bill, HearthError> {
        bill.validate()?;

        let result = sqlx::query(INSERT)
            .bind(bill.id.as_uuid())
            .bind(bill.household_id.as_uuid())
            .bind(&bill.title)
            .bind(bill.amount_cents)
            .bind(&bill.currency)
            .bind(codec::date(bill.due_date))
            .bind(bill.status.as_str())
            .bind(bill.created_by_job.map(JobId::as_uuid))
            .bind(codec::timestamp(bill.created_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let Some(job_id) = bill.created_by_job.filter(|_| result.rows_affected() == 0) else {
            return Ok(bill);
        };

        tracing::debug!(%job_id, "bill already created by this job");
        let existing: Option<Wrapper> = sqlx::query_as(SELECT_BY_JOB)
            .bind(job_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(existing).unwrap_or(bill))
    }

    async fn get_by_id(&self, id: BillId) -> Result<Option<Bill>, HearthError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn list_unpaid_due_by(
        &self,
        household_id: HouseholdId,
        due_by: Date,
    ) -> Result<Vec<Bill>, HearthError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_UNPAID_DUE_BY)
            .bind(household_id.as_uuid())
            .bind(codec::date(due_by))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn mark_overdue(&self, household_id: HouseholdId, today: Date) -> Result<u64, HearthError> {
        let result = sqlx::query(MARK_OVERDUE)
            .bind(household_id.as_uuid())
            .bind(codec::date(today))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(result.rows_affected())
    }
}

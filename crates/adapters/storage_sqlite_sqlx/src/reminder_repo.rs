//! `SQLite` implementation of [`ReminderRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hearth_app::ports::ReminderRepository;
use hearth_domain::error::HearthError;
use hearth_domain::id::{BillId, HouseholdId, ReminderId};
use hearth_domain::reminder::Reminder;

use crate::codec;
use crate::error::StorageError;

struct Wrapper(Reminder);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let household_id: uuid::Uuid = row.try_get("household_id")?;
        let bill_id: uuid::Uuid = row.try_get("bill_id")?;
        let remind_on: String = row.try_get("remind_on")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Self(Reminder {
            id: ReminderId::from_uuid(id),
            household_id: HouseholdId::from_uuid(household_id),
            bill_id: BillId::from_uuid(bill_id),
            remind_on: codec::parse_date(&remind_on)?,
            lead_days: row.try_get("lead_days")?,
            created_at: codec::parse_timestamp(&created_at)?,
        }))
    }
}

const UPSERT: &str = r"
    INSERT INTO reminders (id, household_id, bill_id, remind_on, lead_days, created_at)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT (bill_id, lead_days) DO NOTHING
";

const SELECT_BY_BILL: &str = "SELECT * FROM reminders WHERE bill_id = ? ORDER BY remind_on";

/// `SQLite`-backed reminder repository.
pub struct SqliteReminderRepository {
    pool: SqlitePool,
}

impl SqliteReminderRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ReminderRepository for SqliteReminderRepository {
    async fn upsert(&self, reminder: Reminder) -> Result<bool, HearthError> {
        let result = sqlx::query(UPSERT)
            .bind(reminder.id.as_uuid())
            .bind(reminder.household_id.as_uuid())
            .bind(reminder.bill_id.as_uuid())
            .bind(codec::date(reminder.remind_on))
            .bind(reminder.lead_days)
            .bind(codec::timestamp(reminder.created_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_bill(&self, bill_id: BillId) -> Result<Vec<Reminder>, HearthError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_BILL)
            .bind(bill_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

//! `SQLite` implementation of the [`Notifier`] port: the household inbox.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hearth_app::ports::Notifier;
use hearth_domain::error::HearthError;
use hearth_domain::id::{HouseholdId, JobId, NotificationId};
use hearth_domain::notification::Notification;

use crate::codec;
use crate::error::StorageError;

struct Wrapper(Notification);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let household_id: uuid::Uuid = row.try_get("household_id")?;
        let job_id: Option<uuid::Uuid> = row.try_get("job_id")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Self(Notification {
            id: NotificationId::from_uuid(id),
            household_id: HouseholdId::from_uuid(household_id),
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            job_id: job_id.map(JobId::from_uuid),
            read: row.try_get("read")?,
            created_at: codec::parse_timestamp(&created_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO notifications (id, household_id, title, body, job_id, read, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (job_id) DO NOTHING
";

const SELECT_BY_HOUSEHOLD: &str =
    "SELECT * FROM notifications WHERE household_id = ? ORDER BY created_at DESC, rowid DESC";

/// `SQLite`-backed household inbox.
pub struct SqliteNotificationStore {
    pool: SqlitePool,
}

impl SqliteNotificationStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl Notifier for SqliteNotificationStore {
    async fn notify(&self, notification: Notification) -> Result<bool, HearthError> {
        let result = sqlx::query(INSERT)
            .bind(notification.id.as_uuid())
            .bind(notification.household_id.as_uuid())
            .bind(&notification.title)
            .bind(&notification.body)
            .bind(notification.job_id.map(JobId::as_uuid))
            .bind(notification.read)
            .bind(codec::timestamp(notification.created_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_household(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<Notification>, HearthError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_HOUSEHOLD)
            .bind(household_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::memory_pool;

    #[tokio::test]
    async fn should_keep_one_notification_per_job() {
        let store = SqliteNotificationStore::new(memory_pool().await);
        let hh = HouseholdId::new();
        let job = JobId::new();

        let first = Notification::new(hh, "Rent due", Some("Friday".into())).from_job(job);
        let again = Notification::new(hh, "Rent due", Some("Friday".into())).from_job(job);

        assert!(store.notify(first.clone()).await.unwrap());
        assert!(!store.notify(again).await.unwrap());
        assert!(store.notify(Notification::new(hh, "Hello", None)).await.unwrap());
        assert!(store.notify(Notification::new(hh, "Hello again", None)).await.unwrap());

        let inbox = store.list_for_household(hh).await.unwrap();
        assert_eq!(inbox.len(), 3);
        assert_eq!(inbox[2], first);
        assert!(store.list_for_household(HouseholdId::new()).await.unwrap().is_empty());
    }
}

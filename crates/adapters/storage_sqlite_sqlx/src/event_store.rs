//! `SQLite` implementation of [`EventStore`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hearth_app::ports::EventStore;
use hearth_domain::error::HearthError;
use hearth_domain::event::DomainEvent;
use hearth_domain::id::{EventId, HouseholdId};
use hearth_domain::time::now;

use crate::codec;
use crate::error::StorageError;

struct Wrapper(DomainEvent);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<DomainEvent> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let household_id: uuid::Uuid = row.try_get("household_id")?;
        let payload: String = row.try_get("payload")?;
        let occurred_at: String = row.try_get("occurred_at")?;

        Ok(Self(DomainEvent {
            id: EventId::from_uuid(id),
            household_id: HouseholdId::from_uuid(household_id),
            event_type: row.try_get("event_type")?,
            source: row.try_get("source")?,
            payload: codec::parse_json(&payload)?,
            occurred_at: codec::parse_timestamp(&occurred_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO events (id, household_id, event_type, source, payload, occurred_at, recorded_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (id) DO NOTHING
";

const SELECT_BY_ID: &str = "SELECT * FROM events WHERE id = ?";
const SELECT_RECENT: &str = "SELECT * FROM events ORDER BY recorded_at DESC, rowid DESC LIMIT ?";

/// `SQLite`-backed event store.
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Create a new event store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EventStore for SqliteEventStore {
    async fn store(&self, event: DomainEvent) -> Result<DomainEvent, HearthError> {
        let payload = serde_json::to_string(&event.payload).map_err(StorageError::from)?;

        let result = sqlx::query(INSERT)
            .bind(event.id.as_uuid())
            .bind(event.household_id.as_uuid())
            .bind(&event.event_type)
            .bind(&event.source)
            .bind(&payload)
            .bind(codec::timestamp(event.occurred_at))
            .bind(codec::timestamp(now()))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() > 0 {
            return Ok(event);
        }

        tracing::debug!(event_id = %event.id, "event already stored");
        let existing = self.get_by_id(event.id).await?;
        Ok(existing.unwrap_or(event))
    }

    async fn get_by_id(&self, id: EventId) -> Result<Option<DomainEvent>, HearthError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<DomainEvent>, HearthError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

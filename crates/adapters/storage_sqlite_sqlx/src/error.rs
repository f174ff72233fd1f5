//! Storage-specific error type wrapping sqlx errors.

use hearth_domain::error::HearthError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize a value into a JSON column.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A column returned by a write held a value the domain does not know.
    #[error("unexpected stored value")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<StorageError> for HearthError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

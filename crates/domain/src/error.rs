//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`HearthError`] via `#[from]`.

/// Top-level error returned by domain validation and by every port.
#[derive(Debug, thiserror::Error)]
pub enum HearthError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A domain invariant was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("at least one action is required")]
    NoActions,

    #[error("an enabled rule needs at least one trigger")]
    NoTriggers,

    #[error("trigger event type must not be empty")]
    EmptyTrigger,

    #[error("action name must not be empty")]
    EmptyActionName,

    #[error("event type must not be empty")]
    EmptyEventType,

    #[error("invalid action `{action}`: {reason}")]
    InvalidAction { action: String, reason: String },

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("max_attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("invalid identifier `{0}`")]
    InvalidId(String),
}

/// A looked-up record does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} `{id}` not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

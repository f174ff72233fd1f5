//! Domain event: an immutable record of something that happened.
//!
//! Events are produced outside the engine (calendar, bills, chores, …) and
//! persisted before they are handed to the dispatcher. The engine never
//! mutates or re-emits them.

use serde::{Deserialize, Serialize};

use crate::error::{HearthError, ValidationError};
use crate::id::{EventId, HouseholdId};
use crate::time::{Timestamp, now};

/// A fact reported by another part of the product, e.g. `bill.due_soon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: EventId,
    pub household_id: HouseholdId,
    /// Free-form type tag matched exactly against rule triggers.
    pub event_type: String,
    /// Which subsystem produced the event (e.g. `"bills"`).
    pub source: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub occurred_at: Timestamp,
}

impl DomainEvent {
    /// Create a new event with a fresh id, occurring now.
    #[must_use]
    pub fn new(
        household_id: HouseholdId,
        event_type: impl Into<String>,
        source: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::new(),
            household_id,
            event_type: event_type.into(),
            source: source.into(),
            payload,
            occurred_at: now(),
        }
    }

    /// Replace the generated id, e.g. with one assigned by the producer.
    #[must_use]
    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = id;
        self
    }

    /// Replace the occurrence time.
    #[must_use]
    pub fn occurred_at(mut self, ts: Timestamp) -> Self {
        self.occurred_at = ts;
        self
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyEventType`] when `event_type` is blank.
    pub fn validate(&self) -> Result<(), HearthError> {
        if self.event_type.trim().is_empty() {
            return Err(ValidationError::EmptyEventType.into());
        }
        Ok(())
    }
}

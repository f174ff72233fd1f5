//! Event store port: append-only log of domain events.

use std::future::Future;
use std::sync::Arc;

use hearth_domain::error::HearthError;
use hearth_domain::event::DomainEvent;
use hearth_domain::id::EventId;

/// Store for persisting and querying [`DomainEvent`]s.
pub trait EventStore {
    /// Persist an event.
    ///
    /// Re-delivering an event with a known id is not an error: the stored
    /// event is returned unchanged.
    fn store(
        &self,
        event: DomainEvent,
    ) -> impl Future<Output = Result<DomainEvent, HearthError>> + Send;

    /// Get an event by its unique identifier.
    fn get_by_id(
        &self,
        id: EventId,
    ) -> impl Future<Output = Result<Option<DomainEvent>, HearthError>> + Send;

    /// Get recent events, newest first, up to `limit`.
    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DomainEvent>, HearthError>> + Send;
}

impl<T: EventStore + Send + Sync> EventStore for Arc<T> {
    fn store(
        &self,
        event: DomainEvent,
    ) -> impl Future<Output = Result<DomainEvent, HearthError>> + Send {
        (**self).store(event)
    }

    fn get_by_id(
        &self,
        id: EventId,
    ) -> impl Future<Output = Result<Option<DomainEvent>, HearthError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DomainEvent>, HearthError>> + Send {
        (**self).get_recent(limit)
    }
}

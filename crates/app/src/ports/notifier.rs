//! Notifier port: the household inbox.

use std::future::Future;
use std::sync::Arc;

use hearth_domain::error::HearthError;
use hearth_domain::id::HouseholdId;
use hearth_domain::notification::Notification;

/// Delivers notifications to a household.
pub trait Notifier {
    /// Deliver `notification`.
    ///
    /// At most one notification is kept per `job_id`; returns `false` when the
    /// emitting job already delivered one.
    fn notify(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<bool, HearthError>> + Send;

    /// Inbox of a household, newest first.
    fn list_for_household(
        &self,
        household_id: HouseholdId,
    ) -> impl Future<Output = Result<Vec<Notification>, HearthError>> + Send;
}

impl<T: Notifier + Send + Sync> Notifier for Arc<T> {
    fn notify(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<bool, HearthError>> + Send {
        (**self).notify(notification)
    }

    fn list_for_household(
        &self,
        household_id: HouseholdId,
    ) -> impl Future<Output = Result<Vec<Notification>, HearthError>> + Send {
        (**self).list_for_household(household_id)
    }
}

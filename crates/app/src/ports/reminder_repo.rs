use std::future::Future;
use std::sync::Arc;

use hearth_domain::error::HearthError;
use hearth_domain::id::BillId;
use hearth_domain::reminder::Reminder;

/// Reminders attached to bills.
pub trait ReminderRepository {
    /// Insert the reminder unless one already exists for its
    /// `(bill_id, lead_days)`. Returns `true` when a row was written.
    fn upsert(&self, reminder: Reminder) -> impl Future<Output = Result<bool, HearthError>> + Send;

    fn list_for_bill(
        &self,
        bill_id: BillId,
    ) -> impl Future<Output = Result<Vec<Reminder>, HearthError>> + Send;
}

impl<T: ReminderRepository + Send + Sync> ReminderRepository for Arc<T> {
    fn upsert(&self, reminder: Reminder) -> impl Future<Output = Result<bool, HearthError>> + Send {
        (**self).upsert(reminder)
    }

    fn list_for_bill(
        &self,
        bill_id: BillId,
    ) -> impl Future<Output = Result<Vec<Reminder>, HearthError>> + Send {
        (**self).list_for_bill(bill_id)
    }
}

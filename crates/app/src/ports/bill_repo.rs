use std::future::Future;
use std::sync::Arc;

use hearth_domain::bill::Bill;
use hearth_domain::error::HearthError;
use hearth_domain::id::{BillId, HouseholdId};
use hearth_domain::time::Date;

/// Bills of a household, as read and written by the bill actions.
pub trait BillRepository {
    /// Insert `bill`, unless a bill was already created by the same job.
    ///
    /// Returns the bill that is stored for `bill.created_by_job`, which is the
    /// existing one when the job is re-executed.
    fn create_for_job(&self, bill: Bill) -> impl Future<Output = Result<Bill, HearthError>> + Send;

    fn get_by_id(
        &self,
        id: BillId,
    ) -> impl Future<Output = Result<Option<Bill>, HearthError>> + Send;

    /// Unpaid bills of the household due on or before `due_by`, by due date.
    fn list_unpaid_due_by(
        &self,
        household_id: HouseholdId,
        due_by: Date,
    ) -> impl Future<Output = Result<Vec<Bill>, HearthError>> + Send;

    /// Flag unpaid bills due strictly before `today` as overdue.
    /// Returns the number of bills changed.
    fn mark_overdue(
        &self,
        household_id: HouseholdId,
        today: Date,
    ) -> impl Future<Output = Result<u64, HearthError>> + Send;
}

impl<T: BillRepository + Send + Sync> BillRepository for Arc<T> {
    fn create_for_job(&self, bill: Bill) -> impl Future<Output = Result<Bill, HearthError>> + Send {
        (**self).create_for_job(bill)
    }

    fn get_by_id(
        &self,
        id: BillId,
    ) -> impl Future<Output = Result<Option<Bill>, HearthError>> + Send {
        (**self).get_by_id(id)
    }

    fn list_unpaid_due_by(
        &self,
        household_id: HouseholdId,
        due_by: Date,
    ) -> impl Future<Output = Result<Vec<Bill>, HearthError>> + Send {
        (**self).list_unpaid_due_by(household_id, due_by)
    }

    fn mark_overdue(
        &self,
        household_id: HouseholdId,
        today: Date,
    ) -> impl Future<Output = Result<u64, HearthError>> + Send {
        (**self).mark_overdue(household_id, today)
    }
}

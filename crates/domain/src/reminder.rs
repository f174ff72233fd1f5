//! Reminder: a dated nudge about an upcoming bill.

use serde::{Deserialize, Serialize};

use crate::bill::{Bill, BillStatus};
use crate::id::{BillId, HouseholdId, ReminderId};
use crate::time::{Date, Timestamp, now};

/// A reminder to surface `lead_days` before a bill's due date.
///
/// At most one reminder exists per `(bill_id, lead_days)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub household_id: HouseholdId,
    pub bill_id: BillId,
    pub remind_on: Date,
    pub lead_days: u32,
    pub created_at: Timestamp,
}

/// Reminders to schedule for `bill` given the configured lead times.
///
/// Only unpaid bills due within the largest lead time get reminders, and
/// only for reminder dates that are today or later.
#[must_use]
pub fn plan(bill: &Bill, lead_days: &[u32], today: Date) -> Vec<Reminder> {
    if bill.status != BillStatus::Unpaid || bill.due_date < today {
        return Vec::new();
    }
    let horizon = lead_days.iter().copied().max().unwrap_or(0);
    let days_until_due = (bill.due_date - today).num_days();
    if days_until_due > i64::from(horizon) {
        return Vec::new();
    }

    let mut leads: Vec<u32> = lead_days.to_vec();
    leads.sort_unstable();
    leads.dedup();

    leads
        .into_iter()
        .filter_map(|lead| {
            let remind_on = bill
                .due_date
                .checked_sub_days(chrono::Days::new(u64::from(lead)))?;
            (remind_on >= today).then(|| Reminder {
                id: ReminderId::new(),
                household_id: bill.household_id,
                bill_id: bill.id,
                remind_on,
                lead_days: lead,
                created_at: now(),
            })
        })
        .collect()
}

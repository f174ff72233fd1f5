use chrono::Days;
use hearth_domain::reminder;
use hearth_domain::time::today;
use serde::Deserialize;
use serde_json::json;

use super::{Action, ActionContext, ActionError, ActionResult};
use crate::ports::{BillRepository, ReminderRepository};

/// Lead times used when a rule does not specify any.
pub const DEFAULT_LEAD_DAYS: [u32; 3] = [1, 3, 7];

const MAX_LEAD_DAYS: u32 = 366;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleBillRemindersParams {
    #[serde(default = "default_lead_days")]
    pub lead_days: Vec<u32>,
}

fn default_lead_days() -> Vec<u32> {
    DEFAULT_LEAD_DAYS.to_vec()
}

/// Creates reminders for the household's upcoming unpaid bills.
///
/// One reminder per `(bill, lead time)`; existing reminders are left alone.
pub struct ScheduleBillReminders<B, R> {
    bills: B,
    reminders: R,
}

impl<B, R> ScheduleBillReminders<B, R> {
    pub fn new(bills: B, reminders: R) -> Self {
        Self { bills, reminders }
    }
}

impl<B, R> Action for ScheduleBillReminders<B, R>
where
    B: BillRepository + Send + Sync + 'static,
    R: ReminderRepository + Send + Sync + 'static,
{
    const NAME: &'static str = "schedule_bill_reminders";
    type Params = ScheduleBillRemindersParams;

    fn validate(params: &ScheduleBillRemindersParams) -> Result<(), String> {
        if params.lead_days.is_empty() {
            return Err("lead_days must not be empty".into());
        }
        if let Some(lead) = params.lead_days.iter().find(|d| **d > MAX_LEAD_DAYS) {
            return Err(format!("lead time of {lead} days exceeds {MAX_LEAD_DAYS}"));
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &ActionContext,
        params: ScheduleBillRemindersParams,
    ) -> Result<ActionResult, ActionError> {
        let today = today();
        let horizon = params.lead_days.iter().copied().max().unwrap_or(0);
        let due_by = today
            .checked_add_days(Days::new(u64::from(horizon)))
            .unwrap_or(today);

        let bills = self
            .bills
            .list_unpaid_due_by(ctx.household_id, due_by)
            .await?;

        let mut created = 0_usize;
        for bill in &bills {
            for planned in reminder::plan(bill, &params.lead_days, today) {
                if self.reminders.upsert(planned).await? {
                    created += 1;
                }
            }
        }

        tracing::debug!(bills = bills.len(), created, "scheduled bill reminders");
        Ok(
            ActionResult::ok(format!("{created} reminder(s) scheduled")).with_data(json!({
                "bills_scanned": bills.len(),
                "reminders_created": created,
            })),
        )
    }
}

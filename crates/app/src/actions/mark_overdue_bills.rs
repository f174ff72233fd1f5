use hearth_domain::time::today;
use serde::Deserialize;
use serde_json::json;

use super::{Action, ActionContext, ActionError, ActionResult};
use crate::ports::BillRepository;

/// `mark_overdue_bills` takes no parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MarkOverdueBillsParams {}

/// Flags the household's unpaid bills whose due date has passed.
pub struct MarkOverdueBills<B> {
    bills: B,
}

impl<B> MarkOverdueBills<B> {
    pub fn new(bills: B) -> Self {
        Self { bills }
    }
}

impl<B: BillRepository + Send + Sync + 'static> Action for MarkOverdueBills<B> {
    const NAME: &'static str = "mark_overdue_bills";
    type Params = MarkOverdueBillsParams;

    async fn execute(
        &self,
        ctx: &ActionContext,
        _params: MarkOverdueBillsParams,
    ) -> Result<ActionResult, ActionError> {
        let marked = self.bills.mark_overdue(ctx.household_id, today()).await?;
        Ok(ActionResult::ok(format!("{marked} bill(s) marked overdue"))
            .with_data(json!({ "marked": marked })))
    }
}

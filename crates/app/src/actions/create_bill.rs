use hearth_domain::bill::Bill;
use hearth_domain::time::Date;
use serde::Deserialize;
use serde_json::json;

use super::{Action, ActionContext, ActionError, ActionResult};
use crate::ports::BillRepository;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateBillParams {
    pub title: String,
    pub amount_cents: i64,
    pub due_date: Date,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Records a bill for the household.
///
/// The bill is keyed by the job that created it, so re-running the job
/// returns the bill from the first run.
pub struct CreateBill<B> {
    bills: B,
}

impl<B> CreateBill<B> {
    pub fn new(bills: B) -> Self {
        Self { bills }
    }
}

impl<B: BillRepository + Send + Sync + 'static> Action for CreateBill<B> {
    const NAME: &'static str = "create_bill";
    type Params = CreateBillParams;

    fn validate(params: &CreateBillParams) -> Result<(), String> {
        if params.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        if params.amount_cents <= 0 {
            return Err(format!(
                "amount_cents must be positive, got {}",
                params.amount_cents
            ));
        }
        if params
            .currency
            .as_deref()
            .is_some_and(|c| c.len() != 3 || !c.chars().all(|ch| ch.is_ascii_alphabetic()))
        {
            return Err("currency must be a three-letter code".into());
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &ActionContext,
        params: CreateBillParams,
    ) -> Result<ActionResult, ActionError> {
        let mut builder = Bill::builder()
            .household_id(ctx.household_id)
            .title(params.title)
            .amount_cents(params.amount_cents)
            .due_date(params.due_date)
            .created_by_job(ctx.job_id);
        if let Some(currency) = params.currency {
            builder = builder.currency(currency.to_ascii_uppercase());
        }
        let bill = self.bills.create_for_job(builder.build()?).await?;

        Ok(
            ActionResult::ok(format!("bill `{}` recorded", bill.title)).with_data(json!({
                "bill_id": bill.id,
                "due_date": bill.due_date,
            })),
        )
    }
}

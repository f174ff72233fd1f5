//! Bill: a household billing obligation.
//!
//! Bills are owned by the bills subsystem; the engine only touches them
//! through built-in actions (create, mark overdue, schedule reminders).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HearthError, ValidationError};
use crate::id::{BillId, HouseholdId, JobId};
use crate::time::{Date, Timestamp, now};

/// Payment state of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Unpaid,
    Paid,
    Overdue,
}

impl BillStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown bill status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown bill status `{0}`")]
pub struct UnknownBillStatus(pub String);

impl FromStr for BillStatus {
    type Err = UnknownBillStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            other => Err(UnknownBillStatus(other.to_string())),
        }
    }
}

/// An amount owed by a household, due on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub household_id: HouseholdId,
    pub title: String,
    /// Amount in minor currency units.
    pub amount_cents: i64,
    pub currency: String,
    pub due_date: Date,
    pub status: BillStatus,
    /// Job that created the bill, if it was created by an automation.
    pub created_by_job: Option<JobId>,
    pub created_at: Timestamp,
}

impl Bill {
    /// Create a builder for constructing a [`Bill`].
    #[must_use]
    pub fn builder() -> BillBuilder {
        BillBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] when the title is blank or the
    /// amount is not positive.
    pub fn validate(&self) -> Result<(), HearthError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        if self.amount_cents <= 0 {
            return Err(ValidationError::NonPositiveAmount(self.amount_cents).into());
        }
        Ok(())
    }

    /// An unpaid bill whose due date has passed.
    #[must_use]
    pub fn is_past_due(&self, today: Date) -> bool {
        self.status == BillStatus::Unpaid && self.due_date < today
    }
}

/// Step-by-step builder for [`Bill`].
#[derive(Debug, Default)]
pub struct BillBuilder {
    id: Option<BillId>,
    household_id: Option<HouseholdId>,
    title: Option<String>,
    amount_cents: i64,
    currency: Option<String>,
    due_date: Option<Date>,
    status: Option<BillStatus>,
    created_by_job: Option<JobId>,
}

impl BillBuilder {
    #[must_use]
    pub fn id(mut self, id: BillId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn household_id(mut self, household_id: HouseholdId) -> Self {
        self.household_id = Some(household_id);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn amount_cents(mut self, amount_cents: i64) -> Self {
        self.amount_cents = amount_cents;
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    #[must_use]
    pub fn due_date(mut self, due_date: Date) -> Self {
        self.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub fn status(mut self, status: BillStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn created_by_job(mut self, job_id: JobId) -> Self {
        self.created_by_job = Some(job_id);
        self
    }

    /// Consume the builder, validate, and return a [`Bill`].
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if the title or amount is invalid.
    pub fn build(self) -> Result<Bill, HearthError> {
        let bill = Bill {
            id: self.id.unwrap_or_default(),
            household_id: self.household_id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            amount_cents: self.amount_cents,
            currency: self.currency.unwrap_or_else(|| "USD".to_string()),
            due_date: self.due_date.unwrap_or_else(crate::time::today),
            status: self.status.unwrap_or(BillStatus::Unpaid),
            created_by_job: self.created_by_job,
            created_at: now(),
        };
        bill.validate()?;
        Ok(bill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn should_build_unpaid_bill_with_default_currency() {
        let bill = Bill::builder()
            .title("Electricity")
            .amount_cents(4_200)
            .due_date(date(2026, 3, 1))
            .build()
            .unwrap();
        assert_eq!(bill.status, BillStatus::Unpaid);
        assert_eq!(bill.currency, "USD");
        assert!(bill.created_by_job.is_none());
    }

    #[test]
    fn should_reject_blank_title() {
        let result = Bill::builder().title(" ").amount_cents(100).build();
        assert!(matches!(
            result,
            Err(HearthError::Validation(ValidationError::EmptyTitle))
        ));
    }

    #[test]
    fn should_reject_non_positive_amount() {
        let result = Bill::builder().title("Water").amount_cents(0).build();
        assert!(matches!(
            result,
            Err(HearthError::Validation(ValidationError::NonPositiveAmount(0)))
        ));
    }

    #[test]
    fn should_be_past_due_only_when_unpaid_and_after_due_date() {
        let mut bill = Bill::builder()
            .title("Rent")
            .amount_cents(150_000)
            .due_date(date(2026, 3, 1))
            .build()
            .unwrap();
        assert!(!bill.is_past_due(date(2026, 3, 1)));
        assert!(bill.is_past_due(date(2026, 3, 2)));
        bill.status = BillStatus::Paid;
        assert!(!bill.is_past_due(date(2026, 3, 2)));
    }

    #[test]
    fn should_parse_status_strings() {
        assert_eq!("overdue".parse::<BillStatus>().unwrap(), BillStatus::Overdue);
        assert!("late".parse::<BillStatus>().is_err());
    }
}

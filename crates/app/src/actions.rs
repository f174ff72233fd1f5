//! Actions: the side effects a job can perform.
//!
//! An [`Action`] declares its name, its typed parameters, and how to execute.
//! Actions are registered in an [`ActionRegistry`], which erases the parameter
//! type so the worker can look handlers up by the name stored on the job.
//!
//! Every action must be safe to run more than once for the same job: the
//! worker may re-execute a job after a crash or a lost claim.

mod create_bill;
mod mark_overdue_bills;
mod notify;
mod registry;
mod schedule_bill_reminders;

use std::future::Future;
use std::time::Duration;

use hearth_domain::error::{HearthError, ValidationError};
use hearth_domain::id::{EventId, HouseholdId, JobId, RuleId};
use hearth_domain::job::Job;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use create_bill::{CreateBill, CreateBillParams};
pub use mark_overdue_bills::{MarkOverdueBills, MarkOverdueBillsParams};
pub use notify::{Notify, NotifyParams};
pub use registry::{ActionHandler, ActionRegistry};
pub use schedule_bill_reminders::{
    DEFAULT_LEAD_DAYS, ScheduleBillReminders, ScheduleBillRemindersParams,
};

use crate::ports::{BillRepository, Notifier, ReminderRepository};

/// A typed, named side effect.
pub trait Action: Send + Sync + 'static {
    /// Name used in rule definitions and stored on jobs.
    const NAME: &'static str;

    /// Parameters, decoded from the job's JSON params.
    type Params: DeserializeOwned + Send + 'static;

    /// Semantic checks that decoding alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when `params` are unusable.
    fn validate(_params: &Self::Params) -> Result<(), String> {
        Ok(())
    }

    /// Per-action execution limit; `None` uses the worker default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Perform the side effect for one job.
    fn execute(
        &self,
        ctx: &ActionContext,
        params: Self::Params,
    ) -> impl Future<Output = Result<ActionResult, ActionError>> + Send;
}

/// What a handler knows about the job it runs for.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionContext {
    pub job_id: JobId,
    pub household_id: HouseholdId,
    pub rule_id: Option<RuleId>,
    pub event_id: Option<EventId>,
    pub params: serde_json::Value,
}

impl ActionContext {
    #[must_use]
    pub fn for_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            household_id: job.household_id,
            rule_id: job.rule_id,
            event_id: job.event_id,
            params: job.params.clone(),
        }
    }
}

/// Outcome reported by a handler that ran to completion.
///
/// `success = false` is a transient failure: the job is retried while
/// attempts remain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ActionResult {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Errors raised while resolving or running an action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("no handler registered for action `{0}`")]
    Unregistered(String),

    #[error("invalid params for action `{action}`: {reason}")]
    InvalidParams { action: String, reason: String },

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Storage(#[from] HearthError),

    #[error("action timed out after {0:?}")]
    TimedOut(Duration),

    #[error("action panicked: {0}")]
    Panicked(String),
}

impl ActionError {
    /// Whether retrying cannot help.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Unregistered(_)
                | Self::InvalidParams { .. }
                | Self::Storage(HearthError::Validation(_))
        )
    }

    /// Translate into the validation error reported to rule authors.
    #[must_use]
    pub fn into_validation(self, action: &str) -> ValidationError {
        let reason = match self {
            Self::InvalidParams { reason, .. } => reason,
            other => other.to_string(),
        };
        ValidationError::InvalidAction {
            action: action.to_string(),
            reason,
        }
    }
}

/// Render an error with its source chain, `outer: inner: root`.
#[must_use]
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Registry with every built-in action wired to the given stores.
pub fn builtin_registry<B, R, N>(bills: B, reminders: R, notifier: N) -> ActionRegistry
where
    B: BillRepository + Clone + Send + Sync + 'static,
    R: ReminderRepository + Send + Sync + 'static,
    N: Notifier + Send + Sync + 'static,
{
    let mut registry = ActionRegistry::new();
    registry
        .register(CreateBill::new(bills.clone()))
        .register(ScheduleBillReminders::new(bills.clone(), reminders))
        .register(MarkOverdueBills::new(bills))
        .register(Notify::new(notifier));
    registry
}

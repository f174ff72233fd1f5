use std::time::Duration;

use hearth_domain::notification::Notification;
use serde::Deserialize;
use serde_json::json;

use super::{Action, ActionContext, ActionError, ActionResult};
use crate::ports::Notifier;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotifyParams {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

/// Posts a message to the household inbox, once per job.
pub struct Notify<N> {
    notifier: N,
}

impl<N> Notify<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }
}

impl<N: Notifier + Send + Sync + 'static> Action for Notify<N> {
    const NAME: &'static str = "notify";
    type Params = NotifyParams;

    fn validate(params: &NotifyParams) -> Result<(), String> {
        if params.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        Ok(())
    }

    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(10))
    }

    async fn execute(
        &self,
        ctx: &ActionContext,
        params: NotifyParams,
    ) -> Result<ActionResult, ActionError> {
        let notification =
            Notification::new(ctx.household_id, params.title, params.body).from_job(ctx.job_id);
        let notification_id = notification.id;
        let delivered = self.notifier.notify(notification).await?;
        let message = if delivered {
            "notification delivered"
        } else {
            "notification already delivered"
        };
        Ok(ActionResult::ok(message).with_data(json!({
            "notification_id": notification_id,
            "delivered": delivered,
        })))
    }
}

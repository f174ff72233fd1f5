//! Notification: an entry in a household's inbox.

use serde::{Deserialize, Serialize};

use crate::id::{HouseholdId, JobId, NotificationId};
use crate::time::{Timestamp, now};

/// A message surfaced to the household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub household_id: HouseholdId,
    pub title: String,
    pub body: Option<String>,
    /// Job that emitted the notification; at most one notification per job.
    pub job_id: Option<JobId>,
    pub read: bool,
    pub created_at: Timestamp,
}

impl Notification {
    #[must_use]
    pub fn new(household_id: HouseholdId, title: impl Into<String>, body: Option<String>) -> Self {
        Self {
            id: NotificationId::new(),
            household_id,
            title: title.into(),
            body,
            job_id: None,
            read: false,
            created_at: now(),
        }
    }

    /// Tie the notification to the job that emitted it.
    #[must_use]
    pub fn from_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }
}

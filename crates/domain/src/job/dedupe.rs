//! Dedupe key: the uniqueness key that makes event fan-out idempotent.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{EventId, JobId};

/// Identifies the logical unit of work a job stands for.
///
/// Rule-driven jobs are keyed by `{event}:{action}`: one job per action name
/// per event occurrence, however many rules list that action. When one rule
/// lists the same action again, the repeat is keyed `{event}:{n}:{action}`
/// where `n` counts the earlier occurrences, so it gets a job of its own.
/// Manual jobs are keyed by their own id and never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupeKey(String);

impl DedupeKey {
    /// Key for the `occurrence`-th use of `action` in a rule fired by
    /// `event_id`, counting from zero.
    #[must_use]
    pub fn for_event_action(event_id: EventId, occurrence: usize, action: &str) -> Self {
        if occurrence == 0 {
            Self(format!("{event_id}:{action}"))
        } else {
            Self(format!("{event_id}:{occurrence}:{action}"))
        }
    }

    /// Key for a manually triggered job.
    #[must_use]
    pub fn manual(job_id: JobId) -> Self {
        Self(format!("manual:{job_id}"))
    }

    /// Rehydrate a key read back from storage.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

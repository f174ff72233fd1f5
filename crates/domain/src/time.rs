//! Time and timestamp helpers.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};

/// UTC timestamp used for event times, job scheduling, etc.
pub type Timestamp = DateTime<Utc>;

/// Calendar date used for bill due dates and reminder days.
pub type Date = NaiveDate;

/// Return the current UTC time, truncated to microseconds.
///
/// Storage adapters persist timestamps with microsecond precision, so
/// truncating here keeps in-memory and persisted values equal.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

/// Return the current UTC calendar date.
#[must_use]
pub fn today() -> Date {
    Utc::now().date_naive()
}

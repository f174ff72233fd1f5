//! # hearth-app
//!
//! Application layer: the automation engine and its **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `RuleRepository`: rule lookup by `(household, event type)` plus admin CRUD
//!   - `JobQueue`: durable jobs: enqueue by dedupe key, atomic claim, outcome updates
//!   - `EventStore`: append & query domain events
//!   - `BillRepository`, `ReminderRepository`, `Notifier`: records touched by built-in actions
//! - Provide the engine itself:
//!   - `ActionRegistry`: typed, pluggable action handlers keyed by name
//!   - `EventDispatcher`: one event → one pending job per matching rule action
//!   - `Worker`: claims due jobs, runs them, applies the retry policy
//! - Define **driving/inbound ports** as use-case structs:
//!   - `RuleService`, `JobService`, `EventService`
//!
//! ## Dependency rule
//! Depends on `hearth-domain` only (plus `tokio` for timers and task isolation).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod actions;
pub mod dispatcher;
pub mod ports;
pub mod services;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

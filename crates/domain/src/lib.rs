//! # hearth-domain
//!
//! Pure domain model for the hearth household automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Domain events** (immutable records of something that happened)
//! - Define **Rules** (event types → ordered list of actions, per household)
//! - Define **Jobs** (one scheduled unit of work per event/action slot, with
//!   retry state and the dedupe key that makes fan-out idempotent)
//! - Define the household records the built-in actions touch:
//!   **Bills**, **Reminders**, **Notifications**
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod bill;
pub mod event;
pub mod job;
pub mod notification;
pub mod reminder;
pub mod rule;

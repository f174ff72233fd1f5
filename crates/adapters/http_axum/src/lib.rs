//! # hearth-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Accept **domain events** from collaborators (`POST /api/events`) and
//!   hand them to the dispatcher
//! - Serve a **JSON API** for rules, jobs and the failed-job inbox
//! - Let operators trigger a worker pass on demand (`POST /api/worker/run`)
//! - Map application errors into HTTP status codes
//!
//! ## Dependency rule
//! Depends on `hearth-app` (for port traits and services) and `hearth-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

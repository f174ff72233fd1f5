//! # hearth-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the port traits defined in `hearth_app::ports`, including the
//!   job queue with its atomic claim
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `hearth-app` (for port traits) and `hearth-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod codec;

pub mod bill_repo;
pub mod error;
pub mod event_store;
pub mod job_queue;
pub mod notification_store;
pub mod pool;
pub mod reminder_repo;
pub mod rule_repo;

pub use bill_repo::SqliteBillRepository;
pub use event_store::SqliteEventStore;
pub use job_queue::SqliteJobQueue;
pub use notification_store::SqliteNotificationStore;
pub use pool::{Config, Database};
pub use reminder_repo::SqliteReminderRepository;
pub use rule_repo::SqliteRuleRepository;

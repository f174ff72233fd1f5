//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod bill_repo;
pub mod event_store;
pub mod job_queue;
pub mod notifier;
pub mod reminder_repo;
pub mod rule_repo;

pub use bill_repo::BillRepository;
pub use event_store::EventStore;
pub use job_queue::{EnqueueOutcome, JobFilter, JobQueue, ReclaimReport};
pub use notifier::Notifier;
pub use reminder_repo::ReminderRepository;
pub use rule_repo::RuleRepository;

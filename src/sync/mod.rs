//! Traffic usage synchronization
//!
//! [`ReconciliationEngine`] performs one pass over every registered server.
//! [`SyncRunner`] guards it so only one pass runs at a time and
//! [`SyncScheduler`] drives the runner from a cron schedule.

pub mod engine;
pub mod runner;
pub mod scheduler;

pub use engine::{ReconciliationEngine, RunReport, ServerOutcome, ServerStatus, SyncTrigger};
pub use runner::SyncRunner;
pub use scheduler::SyncScheduler;

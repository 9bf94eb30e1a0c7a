//! Repository pattern implementation for data access
//!
//! Servers, users and bindings go through the generic [`Repository`] trait
//! or small purpose-built repositories. Usage facts are written only through
//! the [`UsageStore`] contract, whose units of work map one-to-one onto the
//! per-server transactions of the reconciliation engine.

pub mod server;
pub mod stream_binding;
pub mod traits;
pub mod usage;
pub mod user;

pub use server::ServerRepository;
pub use stream_binding::StreamBindingRepository;
pub use traits::*;
pub use usage::{SqliteUsageStore, UsageStore, UsageUnit};
pub use user::UserRepository;

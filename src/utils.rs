//! Utility functions for the Flussonic manager
//!
//! - `utils::url` for base URL validation and log-safe URL rendering
//! - `utils::time` for canonical usage timestamps and day boundaries

pub mod time;
pub mod url;

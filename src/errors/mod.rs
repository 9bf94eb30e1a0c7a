//! Centralized error handling for the Flussonic manager
//!
//! # Error Categories
//!
//! - **Upstream Errors**: media server connectivity, rejections and payload shape
//! - **Repository Errors**: data access layer failures
//! - **Application Errors**: the taxonomy surfaced to API callers
//!
//! # Usage
//!
//! ```rust
//! use flussonic_manager::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::validation("name must not be empty"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for upstream client Results
pub type UpstreamResult<T> = Result<T, UpstreamError>;

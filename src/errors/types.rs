//! Error type definitions for the Flussonic manager
//!
//! This module defines the error types used throughout the application.
//! Upstream failures are folded into a single [`UpstreamError`] so callers
//! never see transport-specific error types.

use std::fmt;
use thiserror::Error;

/// Top-level application error type
///
/// Every variant maps to exactly one HTTP status at the web boundary
/// (see `web::responses::handle_error`).
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad input detected before any I/O (e.g. a malformed server URL)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Upstream could not be reached (network failure or timeout)
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable { message: String },

    /// Upstream answered with a failure status or an unusable payload
    #[error("Upstream rejected request: {message}")]
    UpstreamRejected { message: String },

    /// Local or upstream entity absent
    #[error("Not found: {resource} '{id}'")]
    NotFound { resource: String, id: String },

    /// Duplicate entity (push URL, server URL, username, binding)
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Authorization denial
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Missing or invalid credentials
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Request validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// SQL query execution failures
    #[error("Query failed: {query} - {message}")]
    QueryFailed { query: String, message: String },

    /// Constraint violations (unique, foreign key, etc.)
    #[error("Constraint violation: {constraint} - {message}")]
    ConstraintViolation { constraint: String, message: String },

    /// Record not found
    #[error("Record not found: {table} with {field} = {value}")]
    RecordNotFound {
        table: String,
        field: String,
        value: String,
    },

    /// Raw driver errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Classification of upstream failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// Client could not be constructed from the given settings
    Configuration,
    /// Network failure, refused connection or timeout
    Unavailable,
    /// Non-2xx status from the media server
    Rejected,
    /// The requested stream does not exist upstream
    NotFound,
    /// 2xx response whose body does not match the expected shape
    Malformed,
}

impl UpstreamErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamErrorKind::Configuration => "configuration",
            UpstreamErrorKind::Unavailable => "unavailable",
            UpstreamErrorKind::Rejected => "rejected",
            UpstreamErrorKind::NotFound => "not_found",
            UpstreamErrorKind::Malformed => "malformed",
        }
    }
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified upstream error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("upstream {kind}: {message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub message: String,
}

impl UpstreamError {
    pub fn new<S: Into<String>>(kind: UpstreamErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::new(UpstreamErrorKind::Configuration, message)
    }

    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(UpstreamErrorKind::Unavailable, message)
    }

    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::new(UpstreamErrorKind::Rejected, message)
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(UpstreamErrorKind::NotFound, message)
    }

    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::new(UpstreamErrorKind::Malformed, message)
    }
}

impl From<UpstreamError> for AppError {
    fn from(error: UpstreamError) -> Self {
        match error.kind {
            UpstreamErrorKind::Configuration => AppError::Configuration {
                message: error.message,
            },
            UpstreamErrorKind::Unavailable => AppError::UpstreamUnavailable {
                message: error.message,
            },
            UpstreamErrorKind::Rejected | UpstreamErrorKind::Malformed => {
                AppError::UpstreamRejected {
                    message: error.message,
                }
            }
            UpstreamErrorKind::NotFound => AppError::NotFound {
                resource: "stream".to_string(),
                id: error.message,
            },
        }
    }
}

/// Convenience methods for creating common error types
impl AppError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl RepositoryError {
    pub fn query_failed<Q: Into<String>, M: Into<String>>(query: Q, message: M) -> Self {
        Self::QueryFailed {
            query: query.into(),
            message: message.into(),
        }
    }

    pub fn record_not_found<T: Into<String>, F: Into<String>, V: Into<String>>(
        table: T,
        field: F,
        value: V,
    ) -> Self {
        Self::RecordNotFound {
            table: table.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn constraint_violation<C: Into<String>, M: Into<String>>(
        constraint: C,
        message: M,
    ) -> Self {
        Self::ConstraintViolation {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    /// Classify a driver error raised by an INSERT, turning unique
    /// violations into [`RepositoryError::ConstraintViolation`].
    pub fn from_insert(query: &str, error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &error {
            if db_err.is_unique_violation() {
                return Self::constraint_violation(query, db_err.message());
            }
            if db_err.is_foreign_key_violation() {
                return Self::constraint_violation(query, db_err.message());
            }
        }
        Self::query_failed(query, error.to_string())
    }
}

//! Core error types for sqlshift.
//!
//! [`ShiftError`] covers the ambient failures shared by every crate in the
//! workspace (configuration, connecting to a database, serialization, I/O).
//! [`ExecutionError`] is the failure of a single statement sent over a
//! database execution channel; it is kept separate because the migration
//! executor attaches operation indices to it and decides whether to roll back.

use std::fmt;

use thiserror::Error;

/// A single SQL statement failed against the live database.
///
/// `sql_state` carries the backend's SQLSTATE (or the closest equivalent the
/// driver exposes) when one is available.
///
/// # Examples
///
/// ```
/// use sqlshift_core::ExecutionError;
///
/// let err = ExecutionError::new("relation \"users\" does not exist").with_sql_state("42P01");
/// assert_eq!(err.to_string(), "[42P01] relation \"users\" does not exist");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    /// The SQLSTATE code reported by the database, if any.
    pub sql_state: Option<String>,
    /// The database's error message.
    pub message: String,
}

impl ExecutionError {
    /// Creates an execution error without a SQLSTATE.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            sql_state: None,
            message: message.into(),
        }
    }

    /// Attaches a SQLSTATE code.
    #[must_use]
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql_state {
            Some(state) => write!(f, "[{state}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ExecutionError {}

/// The ambient error type for sqlshift.
#[derive(Error, Debug)]
pub enum ShiftError {
    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A connection to the database could not be established.
    #[error("Operational error: {0}")]
    Operational(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A statement failed outside of a migration run.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience type alias for `Result<T, ShiftError>`.
pub type ShiftResult<T> = Result<T, ShiftError>;

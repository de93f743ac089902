//! Error types for building, rendering, and applying migrations.
//!
//! Each stage of the pipeline has its own error:
//!
//! - [`ValidationError`] when an operation is constructed with malformed data
//! - [`RenderError`] when an operation cannot be turned into SQL for a dialect
//! - [`InfrastructureError`] when the history store cannot be reached
//! - [`MigrationError`] for everything that can end a migration run
//!
//! Nothing is retried automatically; every error is returned to the caller.

use std::fmt;

use sqlshift_core::ExecutionError;
use thiserror::Error;

use crate::migration::MigrationId;
use crate::operations::OperationKind;

/// Why a single field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A required name or text field is empty or whitespace.
    Empty,
    /// A required collection has no elements.
    EmptyCollection,
    /// Two collections that must line up have different lengths.
    MismatchedArity {
        /// The length the field had to have.
        expected: usize,
        /// The length it actually had.
        actual: usize,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "must not be empty"),
            Self::EmptyCollection => write!(f, "must contain at least one element"),
            Self::MismatchedArity { expected, actual } => {
                write!(f, "has {actual} elements, expected {expected}")
            }
        }
    }
}

/// One violated constraint on an operation field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    /// The offending field, e.g. `table` or `columns[2]`.
    pub field: String,
    /// What is wrong with it.
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` {}", self.field, self.kind)
    }
}

/// An operation was constructed with invalid data.
///
/// All violations are collected before the error is returned, so a caller
/// sees every problem with an operation at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {operation} operation: {}", join_violations(.violations))]
pub struct ValidationError {
    /// The kind of operation being constructed.
    pub operation: OperationKind,
    /// Every violated constraint, in field order.
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Returns `true` if the given field was reported with the given kind.
    pub fn has_violation(&self, field: &str, kind: ViolationKind) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.kind == kind)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A migration id was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationIdError {
    /// The id is empty or whitespace.
    #[error("migration id must not be empty")]
    Empty,
    /// The id does not fit in the history table.
    #[error("migration id is {len} characters long, the maximum is {max}")]
    TooLong {
        /// The id's length in characters.
        len: usize,
        /// The maximum accepted length.
        max: usize,
    },
}

/// Why an operation could not be rendered to SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderErrorKind {
    /// A value tuple does not line up with its column list.
    #[error("row {row} has {actual} values but {expected} columns were given")]
    ArityMismatch {
        /// Zero-based index of the tuple within the operation.
        row: usize,
        /// The number of columns.
        expected: usize,
        /// The number of values in the tuple.
        actual: usize,
    },
    /// The target dialect has no SQL for this operation.
    #[error("{operation} is not supported by {dialect}")]
    Unsupported {
        /// The operation kind.
        operation: OperationKind,
        /// The dialect's vendor name.
        dialect: &'static str,
    },
    /// A value cannot be written as a literal in the target dialect.
    #[error("value for column `{column}` cannot be rendered: {reason}")]
    InvalidValue {
        /// The column the value belongs to.
        column: String,
        /// What is wrong with the value.
        reason: String,
    },
}

/// An operation in a sequence could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operation {operation_index} cannot be rendered: {reason}")]
pub struct RenderError {
    /// Index of the offending operation within its sequence.
    pub operation_index: usize,
    /// The underlying cause.
    pub reason: RenderErrorKind,
}

/// The history store could not be read or written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("history store error: {message}")]
pub struct InfrastructureError {
    /// A description of the failure.
    pub message: String,
}

impl InfrastructureError {
    /// Creates a new infrastructure error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ExecutionError> for InfrastructureError {
    fn from(err: ExecutionError) -> Self {
        Self::new(err.to_string())
    }
}

/// An operation sequence cannot be inverted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operation {operation_index} ({kind}) has no inverse")]
pub struct NotInvertible {
    /// Index of the first operation without an inverse.
    pub operation_index: usize,
    /// Its kind.
    pub kind: OperationKind,
}

/// A migration run ended without the migration being committed and recorded.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The history store reports the migration as already applied. No SQL was
    /// sent.
    #[error("migration {migration_id} has already been applied")]
    AlreadyApplied {
        /// The migration that was requested.
        migration_id: MigrationId,
    },

    /// The sequence contains destructive operations and the run was not
    /// confirmed. No SQL was sent.
    #[error("migration contains destructive operations at {operation_indices:?} and was not confirmed")]
    DestructiveChangeNotConfirmed {
        /// Indices of the destructive operations.
        operation_indices: Vec<usize>,
    },

    /// An operation could not be rendered. No SQL was sent.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The transaction could not be opened. No SQL was sent.
    #[error("failed to begin transaction: {source}")]
    Transaction {
        /// The backend's error.
        source: ExecutionError,
    },

    /// A statement failed and the transaction was rolled back.
    #[error("statement {statement_index} of operation {operation_index} failed: {source}")]
    Execution {
        /// Index of the operation whose statement failed.
        operation_index: usize,
        /// Index of the failing statement within the rendered script.
        statement_index: usize,
        /// The database's error.
        source: ExecutionError,
        /// Set when the rollback itself also failed.
        rollback_error: Option<ExecutionError>,
    },

    /// Every statement succeeded but the commit failed.
    #[error("failed to commit migration: {source}")]
    Commit {
        /// The backend's error.
        source: ExecutionError,
    },

    /// Cancellation was requested between statements and the transaction was
    /// rolled back.
    #[error("migration cancelled before operation {next_operation_index}")]
    Cancelled {
        /// The operation whose statement would have run next.
        next_operation_index: usize,
        /// Set when the rollback failed.
        rollback_error: Option<ExecutionError>,
    },

    /// The history store could not be consulted before the run. No SQL was
    /// sent.
    #[error("failed to check migration history: {source}")]
    HistoryCheck {
        /// The history store's error.
        source: InfrastructureError,
    },

    /// The migration committed but could not be recorded as applied. The
    /// database and the history store now disagree and need manual
    /// reconciliation.
    #[error("migration {migration_id} was committed but could not be recorded: {source}")]
    CommittedButUnrecorded {
        /// The committed migration.
        migration_id: MigrationId,
        /// The history store's error.
        source: InfrastructureError,
    },
}

impl MigrationError {
    /// Returns the index of the operation that caused the failure, when a
    /// single operation is to blame.
    pub const fn failed_operation_index(&self) -> Option<usize> {
        match self {
            Self::Render(err) => Some(err.operation_index),
            Self::Execution {
                operation_index, ..
            } => Some(*operation_index),
            _ => None,
        }
    }

    /// Returns `true` if the database may hold changes the history store
    /// does not know about.
    pub const fn needs_reconciliation(&self) -> bool {
        matches!(self, Self::CommittedButUnrecorded { .. })
    }
}

//! Raw SQL.

use serde::Serialize;

use super::{Checker, MigrationOperation, Operation, OperationKind};
use crate::error::ValidationError;

/// Runs one SQL statement verbatim, on every dialect.
///
/// The statement is opaque to the analyzer, so it is never classified as
/// destructive. Review raw SQL by hand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sql {
    sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    inverse: Option<Box<MigrationOperation>>,
}

impl Sql {
    /// Creates the operation.
    pub fn new(sql: impl Into<String>) -> Result<Self, ValidationError> {
        let sql = sql.into();
        Checker::new(OperationKind::Sql).name("sql", &sql).finish()?;
        Ok(Self { sql, inverse: None })
    }

    /// Attaches the operation that undoes this statement.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<MigrationOperation>) -> Self {
        self.inverse = Some(Box::new(inverse.into()));
        self
    }

    /// Returns the statement text.
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Operation for Sql {
    fn kind(&self) -> OperationKind {
        OperationKind::Sql
    }

    fn describe(&self) -> String {
        const MAX: usize = 60;
        let line = self.sql.lines().next().unwrap_or_default().trim();
        if line.chars().count() > MAX || self.sql.trim().lines().count() > 1 {
            let head: String = line.chars().take(MAX).collect();
            format!("Raw SQL: {head}...")
        } else {
            format!("Raw SQL: {line}")
        }
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        self.inverse.as_deref().cloned()
    }
}

//! Table-level operations.

use serde::Serialize;

use super::{owned_names, Checker, ColumnModel, Destructiveness, MigrationOperation, Operation, OperationKind};
use crate::error::ValidationError;

/// Creates a table.
///
/// Generates `CREATE TABLE` with every column and, when set, a table-level
/// primary key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTable {
    table: String,
    columns: Vec<ColumnModel>,
    primary_key: Vec<String>,
}

impl CreateTable {
    /// Creates the operation. `columns` must not be empty and every column
    /// must be named.
    pub fn new(table: impl Into<String>, columns: Vec<ColumnModel>) -> Result<Self, ValidationError> {
        let table = table.into();
        let mut check = Checker::new(OperationKind::CreateTable);
        check.name("table", &table).non_empty("columns", &columns);
        for (i, column) in columns.iter().enumerate() {
            check.name(&format!("columns[{i}].name"), column.name());
        }
        check.finish()?;
        Ok(Self {
            table,
            columns,
            primary_key: Vec::new(),
        })
    }

    /// Declares a table-level primary key over the given columns.
    pub fn with_primary_key<I, S>(self, columns: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let primary_key = owned_names(columns);
        Checker::new(OperationKind::CreateTable)
            .non_empty("primary_key", &primary_key)
            .names("primary_key", &primary_key)
            .finish()?;
        Ok(Self {
            primary_key,
            ..self
        })
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the column definitions, in declaration order.
    pub fn columns(&self) -> &[ColumnModel] {
        &self.columns
    }

    /// Returns the primary-key columns (empty if none was declared).
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }
}

impl Operation for CreateTable {
    fn kind(&self) -> OperationKind {
        OperationKind::CreateTable
    }

    fn describe(&self) -> String {
        format!("Create table {} ({} columns)", self.table, self.columns.len())
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        Some(
            DropTable {
                table: self.table.clone(),
                inverse: Some(Box::new(self.clone().into())),
            }
            .into(),
        )
    }
}

/// Changes table-level metadata: the table comment.
///
/// A `None` comment removes the existing one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlterTable {
    table: String,
    comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inverse: Option<Box<MigrationOperation>>,
}

impl AlterTable {
    /// Creates the operation.
    pub fn new(table: impl Into<String>, comment: Option<String>) -> Result<Self, ValidationError> {
        let table = table.into();
        Checker::new(OperationKind::AlterTable)
            .name("table", &table)
            .finish()?;
        Ok(Self {
            table,
            comment,
            inverse: None,
        })
    }

    /// Attaches the operation that restores the previous metadata.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<MigrationOperation>) -> Self {
        self.inverse = Some(Box::new(inverse.into()));
        self
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the new comment.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

impl Operation for AlterTable {
    fn kind(&self) -> OperationKind {
        OperationKind::AlterTable
    }

    fn describe(&self) -> String {
        match &self.comment {
            Some(comment) => format!("Set comment on table {} to {comment:?}", self.table),
            None => format!("Remove comment from table {}", self.table),
        }
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        self.inverse.as_deref().cloned()
    }
}

/// Drops a table and everything in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropTable {
    table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    inverse: Option<Box<MigrationOperation>>,
}

impl DropTable {
    /// Creates the operation.
    pub fn new(table: impl Into<String>) -> Result<Self, ValidationError> {
        let table = table.into();
        Checker::new(OperationKind::DropTable)
            .name("table", &table)
            .finish()?;
        Ok(Self {
            table,
            inverse: None,
        })
    }

    /// Attaches the operation that recreates the table. Only the schema can be
    /// restored; dropped rows cannot.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<MigrationOperation>) -> Self {
        self.inverse = Some(Box::new(inverse.into()));
        self
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Operation for DropTable {
    fn kind(&self) -> OperationKind {
        OperationKind::DropTable
    }

    fn describe(&self) -> String {
        format!("Drop table {}", self.table)
    }

    fn is_destructive_change(&self) -> bool {
        true
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        self.inverse.as_deref().cloned()
    }
}

/// Renames a table. Rows are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameTable {
    table: String,
    new_name: String,
}

impl RenameTable {
    /// Creates the operation. `new_name` is an unqualified table name.
    pub fn new(table: impl Into<String>, new_name: impl Into<String>) -> Result<Self, ValidationError> {
        let table = table.into();
        let new_name = new_name.into();
        Checker::new(OperationKind::RenameTable)
            .name("table", &table)
            .name("new_name", &new_name)
            .finish()?;
        Ok(Self { table, new_name })
    }

    /// Returns the current table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the new table name.
    pub fn new_name(&self) -> &str {
        &self.new_name
    }
}

impl Operation for RenameTable {
    fn kind(&self) -> OperationKind {
        OperationKind::RenameTable
    }

    fn describe(&self) -> String {
        format!("Rename table {} to {}", self.table, self.new_name)
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn destructiveness(&self) -> Destructiveness {
        Destructiveness::RenamePreserving
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        Some(
            Self {
                table: self.new_name.clone(),
                new_name: self.table.clone(),
            }
            .into(),
        )
    }
}

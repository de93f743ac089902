//! Column-level operations.

use serde::Serialize;

use super::{Checker, ColumnModel, Destructiveness, MigrationOperation, Operation, OperationKind};
use crate::error::ValidationError;

/// Adds a column to an existing table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddColumn {
    table: String,
    column: ColumnModel,
}

impl AddColumn {
    /// Creates the operation.
    pub fn new(table: impl Into<String>, column: ColumnModel) -> Result<Self, ValidationError> {
        let table = table.into();
        Checker::new(OperationKind::AddColumn)
            .name("table", &table)
            .name("column.name", column.name())
            .finish()?;
        Ok(Self { table, column })
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the new column's definition.
    pub const fn column(&self) -> &ColumnModel {
        &self.column
    }
}

impl Operation for AddColumn {
    fn kind(&self) -> OperationKind {
        OperationKind::AddColumn
    }

    fn describe(&self) -> String {
        format!("Add column {} to {}", self.column.name(), self.table)
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        Some(
            DropColumn {
                table: self.table.clone(),
                column: self.column.name().to_string(),
                inverse: Some(Box::new(self.clone().into())),
            }
            .into(),
        )
    }
}

/// Changes a column's type, nullability, or default.
///
/// Whether the change can lose data (for example, narrowing a type) is decided
/// by whoever builds the operation and fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlterColumn {
    table: String,
    column: ColumnModel,
    destructive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    inverse: Option<Box<MigrationOperation>>,
}

impl AlterColumn {
    /// Creates the operation. `column` is the complete new definition.
    pub fn new(
        table: impl Into<String>,
        column: ColumnModel,
        destructive: bool,
    ) -> Result<Self, ValidationError> {
        let table = table.into();
        Checker::new(OperationKind::AlterColumn)
            .name("table", &table)
            .name("column.name", column.name())
            .finish()?;
        Ok(Self {
            table,
            column,
            destructive,
            inverse: None,
        })
    }

    /// Attaches the operation that restores the previous definition.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<MigrationOperation>) -> Self {
        self.inverse = Some(Box::new(inverse.into()));
        self
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the new column definition.
    pub const fn column(&self) -> &ColumnModel {
        &self.column
    }
}

impl Operation for AlterColumn {
    fn kind(&self) -> OperationKind {
        OperationKind::AlterColumn
    }

    fn describe(&self) -> String {
        format!("Alter column {} on {}", self.column.name(), self.table)
    }

    fn is_destructive_change(&self) -> bool {
        self.destructive
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        self.inverse.as_deref().cloned()
    }
}

/// Drops a column and its data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropColumn {
    table: String,
    column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    inverse: Option<Box<MigrationOperation>>,
}

impl DropColumn {
    /// Creates the operation.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Result<Self, ValidationError> {
        let table = table.into();
        let column = column.into();
        Checker::new(OperationKind::DropColumn)
            .name("table", &table)
            .name("column", &column)
            .finish()?;
        Ok(Self {
            table,
            column,
            inverse: None,
        })
    }

    /// Attaches the operation that re-adds the column. Dropped values cannot be
    /// restored.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<MigrationOperation>) -> Self {
        self.inverse = Some(Box::new(inverse.into()));
        self
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the column name.
    pub fn column(&self) -> &str {
        &self.column
    }
}

impl Operation for DropColumn {
    fn kind(&self) -> OperationKind {
        OperationKind::DropColumn
    }

    fn describe(&self) -> String {
        format!("Drop column {} from {}", self.column, self.table)
    }

    fn is_destructive_change(&self) -> bool {
        true
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        self.inverse.as_deref().cloned()
    }
}

/// Renames a column. Values are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameColumn {
    table: String,
    column: String,
    new_name: String,
}

impl RenameColumn {
    /// Creates the operation.
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let table = table.into();
        let column = column.into();
        let new_name = new_name.into();
        Checker::new(OperationKind::RenameColumn)
            .name("table", &table)
            .name("column", &column)
            .name("new_name", &new_name)
            .finish()?;
        Ok(Self {
            table,
            column,
            new_name,
        })
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the current column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns the new column name.
    pub fn new_name(&self) -> &str {
        &self.new_name
    }
}

impl Operation for RenameColumn {
    fn kind(&self) -> OperationKind {
        OperationKind::RenameColumn
    }

    fn describe(&self) -> String {
        format!(
            "Rename column {} on {} to {}",
            self.column, self.table, self.new_name
        )
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
                table: self.table.clone(),
                column: self.new_name.clone(),
                new_name: self.column.clone(),
            }
            .into(),
        )
    }
}

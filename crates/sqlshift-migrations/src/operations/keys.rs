//! Foreign-key and primary-key constraints.

use serde::Serialize;

use super::{owned_names, Checker, MigrationOperation, Operation, OperationKind, ReferentialAction};
use crate::error::ValidationError;

/// Adds a foreign-key constraint from `table (columns)` to
/// `principal_table (principal_columns)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddForeignKey {
    table: String,
    name: String,
    columns: Vec<String>,
    principal_table: String,
    principal_columns: Vec<String>,
    on_delete: ReferentialAction,
}

impl AddForeignKey {
    /// Creates the operation. Both column lists must be non-empty and of the
    /// same length.
    pub fn new<C, P, S, T>(
        table: impl Into<String>,
        name: impl Into<String>,
        columns: C,
        principal_table: impl Into<String>,
        principal_columns: P,
    ) -> Result<Self, ValidationError>
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
        P: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let table = table.into();
        let name = name.into();
        let columns = owned_names(columns);
        let principal_table = principal_table.into();
        let principal_columns = owned_names(principal_columns);
        Checker::new(OperationKind::AddForeignKey)
            .name("table", &table)
            .name("name", &name)
            .non_empty("columns", &columns)
            .names("columns", &columns)
            .name("principal_table", &principal_table)
            .non_empty("principal_columns", &principal_columns)
            .names("principal_columns", &principal_columns)
            .arity("principal_columns", columns.len(), principal_columns.len())
            .finish()?;
        Ok(Self {
            table,
            name,
            columns,
            principal_table,
            principal_columns,
            on_delete: ReferentialAction::default(),
        })
    }

    /// Sets the `ON DELETE` action.
    #[must_use]
    pub const fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Returns the dependent table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the constraint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the referencing columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the referenced table.
    pub fn principal_table(&self) -> &str {
        &self.principal_table
    }

    /// Returns the referenced columns.
    pub fn principal_columns(&self) -> &[String] {
        &self.principal_columns
    }

    /// Returns the `ON DELETE` action.
    pub const fn on_delete_action(&self) -> ReferentialAction {
        self.on_delete
    }
}

impl Operation for AddForeignKey {
    fn kind(&self) -> OperationKind {
        OperationKind::AddForeignKey
    }

    fn describe(&self) -> String {
        format!(
            "Add foreign key {} on {} ({}) referencing {} ({})",
            self.name,
            self.table,
            self.columns.join(", "),
            self.principal_table,
            self.principal_columns.join(", ")
        )
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        Some(
            DropForeignKey {
                table: self.table.clone(),
                name: self.name.clone(),
                inverse: Some(Box::new(self.clone().into())),
            }
            .into(),
        )
    }
}

/// Drops a foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropForeignKey {
    table: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    inverse: Option<Box<MigrationOperation>>,
}

impl DropForeignKey {
    /// Creates the operation.
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Result<Self, ValidationError> {
        let table = table.into();
        let name = name.into();
        Checker::new(OperationKind::DropForeignKey)
            .name("table", &table)
            .name("name", &name)
            .finish()?;
        Ok(Self {
            table,
            name,
            inverse: None,
        })
    }

    /// Attaches the operation that re-adds the constraint.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<MigrationOperation>) -> Self {
        self.inverse = Some(Box::new(inverse.into()));
        self
    }

    /// Returns the dependent table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the constraint name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Operation for DropForeignKey {
    fn kind(&self) -> OperationKind {
        OperationKind::DropForeignKey
    }

    fn describe(&self) -> String {
        format!("Drop foreign key {} on {}", self.name, self.table)
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        self.inverse.as_deref().cloned()
    }
}

/// Adds a primary-key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddPrimaryKey {
    table: String,
    name: String,
    columns: Vec<String>,
}

impl AddPrimaryKey {
    /// Creates the operation. `columns` must not be empty.
    pub fn new<I, S>(
        table: impl Into<String>,
        name: impl Into<String>,
        columns: I,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = table.into();
        let name = name.into();
        let columns = owned_names(columns);
        Checker::new(OperationKind::AddPrimaryKey)
            .name("table", &table)
            .name("name", &name)
            .non_empty("columns", &columns)
            .names("columns", &columns)
            .finish()?;
        Ok(Self {
            table,
            name,
            columns,
        })
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the constraint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the key columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Operation for AddPrimaryKey {
    fn kind(&self) -> OperationKind {
        OperationKind::AddPrimaryKey
    }

    fn describe(&self) -> String {
        format!(
            "Add primary key {} on {} ({})",
            self.name,
            self.table,
            self.columns.join(", ")
        )
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        Some(
            DropPrimaryKey {
                table: self.table.clone(),
                name: self.name.clone(),
                inverse: Some(Box::new(self.clone().into())),
            }
            .into(),
        )
    }
}

/// Drops a primary-key constraint. The key columns and their values stay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropPrimaryKey {
    table: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    inverse: Option<Box<MigrationOperation>>,
}

impl DropPrimaryKey {
    /// Creates the operation.
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Result<Self, ValidationError> {
        let table = table.into();
        let name = name.into();
        Checker::new(OperationKind::DropPrimaryKey)
            .name("table", &table)
            .name("name", &name)
            .finish()?;
        Ok(Self {
            table,
            name,
            inverse: None,
        })
    }

    /// Attaches the operation that re-adds the key.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<MigrationOperation>) -> Self {
        self.inverse = Some(Box::new(inverse.into()));
        self
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the constraint name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Operation for DropPrimaryKey {
    fn kind(&self) -> OperationKind {
        OperationKind::DropPrimaryKey
    }

    fn describe(&self) -> String {
        format!("Drop primary key {} on {}", self.name, self.table)
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        self.inverse.as_deref().cloned()
    }
}

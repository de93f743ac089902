//! Index operations.

use serde::Serialize;

use super::{owned_names, Checker, Destructiveness, MigrationOperation, Operation, OperationKind};
use crate::error::ValidationError;

/// Creates an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateIndex {
    table: String,
    name: String,
    columns: Vec<String>,
    unique: bool,
}

impl CreateIndex {
    /// Creates a non-unique index over `columns`, which must not be empty.
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
        Checker::new(OperationKind::CreateIndex)
            .name("table", &table)
            .name("name", &name)
            .non_empty("columns", &columns)
            .names("columns", &columns)
            .finish()?;
        Ok(Self {
            table,
            name,
            columns,
            unique: false,
        })
    }

    /// Makes the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the indexed columns, in key order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns whether the index is unique.
    pub const fn is_unique(&self) -> bool {
        self.unique
    }
}

impl Operation for CreateIndex {
    fn kind(&self) -> OperationKind {
        OperationKind::CreateIndex
    }

    fn describe(&self) -> String {
        let unique = if self.unique { "unique " } else { "" };
        format!(
            "Create {unique}index {} on {} ({})",
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
            DropIndex {
                table: self.table.clone(),
                name: self.name.clone(),
                inverse: Some(Box::new(self.clone().into())),
            }
            .into(),
        )
    }
}

/// Drops an index. Indexes hold no data of their own, so this is not
/// destructive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropIndex {
    table: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    inverse: Option<Box<MigrationOperation>>,
}

impl DropIndex {
    /// Creates the operation.
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Result<Self, ValidationError> {
        let table = table.into();
        let name = name.into();
        Checker::new(OperationKind::DropIndex)
            .name("table", &table)
            .name("name", &name)
            .finish()?;
        Ok(Self {
            table,
            name,
            inverse: None,
        })
    }

    /// Attaches the operation that recreates the index.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<MigrationOperation>) -> Self {
        self.inverse = Some(Box::new(inverse.into()));
        self
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the index name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Operation for DropIndex {
    fn kind(&self) -> OperationKind {
        OperationKind::DropIndex
    }

    fn describe(&self) -> String {
        format!("Drop index {} on {}", self.name, self.table)
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        self.inverse.as_deref().cloned()
    }
}

/// Renames an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameIndex {
    table: String,
    name: String,
    new_name: String,
}

impl RenameIndex {
    /// Creates the operation.
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let table = table.into();
        let name = name.into();
        let new_name = new_name.into();
        Checker::new(OperationKind::RenameIndex)
            .name("table", &table)
            .name("name", &name)
            .name("new_name", &new_name)
            .finish()?;
        Ok(Self {
            table,
            name,
            new_name,
        })
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the current index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the new index name.
    pub fn new_name(&self) -> &str {
        &self.new_name
    }
}

impl Operation for RenameIndex {
    fn kind(&self) -> OperationKind {
        OperationKind::RenameIndex
    }

    fn describe(&self) -> String {
        format!(
            "Rename index {} on {} to {}",
            self.name, self.table, self.new_name
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
                name: self.new_name.clone(),
                new_name: self.name.clone(),
            }
            .into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;

    #[test]
    fn test_create_index_validation() {
        let err = CreateIndex::new("users", "", Vec::<String>::new()).unwrap_err();
        assert!(err.has_violation("name", ViolationKind::Empty));
        assert!(err.has_violation("columns", ViolationKind::EmptyCollection));

        let err = CreateIndex::new("users", "ix", ["email", ""]).unwrap_err();
        assert!(err.has_violation("columns[1]", ViolationKind::Empty));
    }

    #[test]
    fn test_create_index_unique_and_inverse() {
        let op = CreateIndex::new("users", "ux_users_email", ["email"])
            .unwrap()
            .unique();
        assert!(op.is_unique());
        assert!(op.describe().contains("unique index"));
        let inverse = op.inverse().unwrap();
        assert_eq!(inverse.kind(), OperationKind::DropIndex);
        assert!(!inverse.is_destructive_change());
        assert_eq!(inverse.inverse(), Some(op.into()));
    }

    #[test]
    fn test_drop_index_without_inverse() {
        let op = DropIndex::new("users", "ix_users_email").unwrap();
        assert!(op.inverse().is_none());
    }

    #[test]
    fn test_rename_index_inverse() {
        let op = RenameIndex::new("users", "ix_a", "ix_b").unwrap();
        assert_eq!(op.destructiveness(), Destructiveness::RenamePreserving);
        assert_eq!(
            op.inverse(),
            Some(RenameIndex::new("users", "ix_b", "ix_a").unwrap().into())
        );
    }
}

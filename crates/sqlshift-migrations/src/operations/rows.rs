//! Row-level data operations.
//!
//! Values are opaque [`Value`]s; the core never checks them against a column
//! type. A value tuple must have one value per column, but that is checked
//! when the operation is rendered, not here: a renderer reports a mismatched
//! tuple as [`RenderErrorKind::ArityMismatch`](crate::error::RenderErrorKind).

use serde::Serialize;
use sqlshift_core::Value;

use super::{owned_names, Checker, MigrationOperation, Operation, OperationKind};
use crate::error::ValidationError;

/// Inserts rows into a table, one row per value tuple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertRows {
    table: String,
    columns: Vec<String>,
    values: Vec<Vec<Value>>,
}

impl InsertRows {
    /// Creates the operation. `columns` and `values` must not be empty.
    pub fn new<I, S>(
        table: impl Into<String>,
        columns: I,
        values: Vec<Vec<Value>>,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = table.into();
        let columns = owned_names(columns);
        Checker::new(OperationKind::InsertRows)
            .name("table", &table)
            .non_empty("columns", &columns)
            .names("columns", &columns)
            .non_empty("values", &values)
            .finish()?;
        Ok(Self {
            table,
            columns,
            values,
        })
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the inserted columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the value tuples, one per row.
    pub fn values(&self) -> &[Vec<Value>] {
        &self.values
    }
}

impl Operation for InsertRows {
    fn kind(&self) -> OperationKind {
        OperationKind::InsertRows
    }

    fn describe(&self) -> String {
        format!("Insert {} row(s) into {}", self.values.len(), self.table)
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    /// Deletes the inserted rows, matching on every inserted column.
    fn inverse(&self) -> Option<MigrationOperation> {
        Some(
            DeleteRows {
                table: self.table.clone(),
                columns: self.columns.clone(),
                values: self.values.clone(),
            }
            .into(),
        )
    }
}

/// Updates rows identified by key values.
///
/// Row `i` of `key_values` selects the rows to change and row `i` of `values`
/// supplies their new values, so both must have the same number of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateRows {
    table: String,
    key_columns: Vec<String>,
    key_values: Vec<Vec<Value>>,
    columns: Vec<String>,
    values: Vec<Vec<Value>>,
}

impl UpdateRows {
    /// Creates the operation.
    ///
    /// `columns` and `values` must not be empty and `key_values` must have as
    /// many rows as `values`. `key_columns` may be empty, in which case each
    /// update applies to the whole table.
    pub fn new<K, S, C, T>(
        table: impl Into<String>,
        key_columns: K,
        key_values: Vec<Vec<Value>>,
        columns: C,
        values: Vec<Vec<Value>>,
    ) -> Result<Self, ValidationError>
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
        C: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let table = table.into();
        let key_columns = owned_names(key_columns);
        let columns = owned_names(columns);
        Checker::new(OperationKind::UpdateRows)
            .name("table", &table)
            .names("key_columns", &key_columns)
            .non_empty("columns", &columns)
            .names("columns", &columns)
            .non_empty("values", &values)
            .arity("key_values", values.len(), key_values.len())
            .finish()?;
        Ok(Self {
            table,
            key_columns,
            key_values,
            columns,
            values,
        })
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the columns that identify rows.
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Returns the key tuples, one per update.
    pub fn key_values(&self) -> &[Vec<Value>] {
        &self.key_values
    }

    /// Returns the columns being set.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the new value tuples, one per update.
    pub fn values(&self) -> &[Vec<Value>] {
        &self.values
    }
}

impl Operation for UpdateRows {
    fn kind(&self) -> OperationKind {
        OperationKind::UpdateRows
    }

    fn describe(&self) -> String {
        format!("Update {} row(s) in {}", self.values.len(), self.table)
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        None
    }
}

/// Deletes rows identified by key values.
///
/// `columns` act as a composite key predicate; each tuple in `values` deletes
/// the rows matching it. Both may be empty. An empty column list with one
/// empty tuple deletes every row in the table, so callers building this
/// operation from user input must guard against that.
///
/// Deleting rows is never classified as a destructive change: destructiveness
/// tracks loss of schema structure, not of data.
///
/// # Examples
///
/// ```
/// use sqlshift_core::Value;
/// use sqlshift_migrations::operations::{DeleteRows, Operation};
///
/// let op = DeleteRows::new("Users", ["Id"], vec![vec![Value::Int(1)], vec![Value::Int(2)]])
///     .unwrap();
/// assert_eq!(op.values().len(), 2);
/// assert!(!op.is_destructive_change());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteRows {
    table: String,
    columns: Vec<String>,
    values: Vec<Vec<Value>>,
}

impl DeleteRows {
    /// Creates the operation. Only `table` is required.
    pub fn new<I, S>(
        table: impl Into<String>,
        columns: I,
        values: Vec<Vec<Value>>,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = table.into();
        let columns = owned_names(columns);
        Checker::new(OperationKind::DeleteRows)
            .name("table", &table)
            .names("columns", &columns)
            .finish()?;
        Ok(Self {
            table,
            columns,
            values,
        })
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the key columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the key tuples, one per deletion predicate.
    pub fn values(&self) -> &[Vec<Value>] {
        &self.values
    }
}

impl Operation for DeleteRows {
    fn kind(&self) -> OperationKind {
        OperationKind::DeleteRows
    }

    fn describe(&self) -> String {
        format!("Delete {} row(s) from {}", self.values.len(), self.table)
    }

    fn is_destructive_change(&self) -> bool {
        false
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;

    #[test]
    fn test_delete_rows_requires_only_table() {
        let err = DeleteRows::new("", Vec::<String>::new(), vec![]).unwrap_err();
        assert_eq!(err.operation, OperationKind::DeleteRows);
        assert_eq!(err.violations.len(), 1);
        assert!(err.has_violation("table", ViolationKind::Empty));

        let op = DeleteRows::new("users", Vec::<String>::new(), vec![]).unwrap();
        assert!(op.columns().is_empty());
        assert!(op.values().is_empty());
    }

    #[test]
    fn test_delete_rows_rejects_blank_column_names() {
        let err = DeleteRows::new("users", ["id", " "], vec![]).unwrap_err();
        assert!(err.has_violation("columns[1]", ViolationKind::Empty));
    }

    #[test]
    fn test_delete_rows_accepts_mismatched_arity() {
        // Checked at render time.
        let op = DeleteRows::new("Users", ["Id"], vec![vec![Value::Int(1), Value::Int(2)]]);
        assert!(op.is_ok());
    }

    #[test]
    fn test_delete_rows_is_never_destructive() {
        let shapes: Vec<(Vec<&str>, Vec<Vec<Value>>)> = vec![
            (vec![], vec![]),
            (vec![], vec![vec![]]),
            (vec!["id"], vec![vec![Value::Int(1)]]),
            (
                vec!["a", "b"],
                vec![vec![Value::Null, Value::from("x")]; 100],
            ),
        ];
        for (columns, values) in shapes {
            let op = DeleteRows::new("users", columns, values).unwrap();
            assert!(!op.is_destructive_change());
            assert!(op.inverse().is_none());
        }
    }

    #[test]
    fn test_insert_rows_validation_and_inverse() {
        let err = InsertRows::new("users", Vec::<String>::new(), vec![]).unwrap_err();
        assert!(err.has_violation("columns", ViolationKind::EmptyCollection));
        assert!(err.has_violation("values", ViolationKind::EmptyCollection));

        let insert = InsertRows::new("users", ["id"], vec![vec![Value::Int(1)]]).unwrap();
        let inverse = insert.inverse().unwrap();
        assert_eq!(
            inverse,
            DeleteRows::new("users", ["id"], vec![vec![Value::Int(1)]])
                .unwrap()
                .into()
        );
    }

    #[test]
    fn test_update_rows_row_counts_must_match() {
        let err = UpdateRows::new(
            "users",
            ["id"],
            vec![vec![Value::Int(1)]],
            ["name"],
            vec![vec![Value::from("a")], vec![Value::from("b")]],
        )
        .unwrap_err();
        assert!(err.has_violation(
            "key_values",
            ViolationKind::MismatchedArity {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_update_rows_has_no_inverse() {
        let op = UpdateRows::new(
            "users",
            ["id"],
            vec![vec![Value::Int(1)]],
            ["name"],
            vec![vec![Value::from("a")]],
        )
        .unwrap();
        assert!(op.inverse().is_none());
        assert!(!op.is_destructive_change());
    }
}

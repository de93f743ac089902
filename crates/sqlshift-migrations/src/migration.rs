//! Migrations and their ordered operation sequences.
//!
//! A [`Migration`] is a named, ordered [`OperationSequence`]. Order is
//! significant and is preserved exactly: operations are never reordered,
//! merged, or dropped. The code that generates a migration is the only place
//! that knows which operations depend on which, so ordering is its job.
//! [`OperationSequence::ordering_hazards`] offers an advisory check.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::{MigrationIdError, NotInvertible};
use crate::operations::{MigrationOperation, Operation};

/// The longest accepted migration id, in characters.
pub const MAX_MIGRATION_ID_LEN: usize = 255;

/// The identifier of a migration, as recorded in the history store.
///
/// # Examples
///
/// ```
/// use sqlshift_migrations::MigrationId;
///
/// let id = MigrationId::new("20240501_add_users").unwrap();
/// assert_eq!(id.as_str(), "20240501_add_users");
/// assert!(MigrationId::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MigrationId(String);

impl MigrationId {
    /// Validates and wraps an id. Surrounding whitespace is not trimmed.
    pub fn new(id: impl Into<String>) -> Result<Self, MigrationIdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(MigrationIdError::Empty);
        }
        let len = id.chars().count();
        if len > MAX_MIGRATION_ID_LEN {
            return Err(MigrationIdError::TooLong {
                len,
                max: MAX_MIGRATION_ID_LEN,
            });
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for MigrationId {
    type Error = MigrationIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for MigrationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An ordered, immutable list of operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OperationSequence(Vec<MigrationOperation>);

impl OperationSequence {
    /// Returns the number of operations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no operations.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the operation at `index`.
    pub fn get(&self, index: usize) -> Option<&MigrationOperation> {
        self.0.get(index)
    }

    /// Iterates over the operations in order.
    pub fn iter(&self) -> std::slice::Iter<'_, MigrationOperation> {
        self.0.iter()
    }

    /// Returns the operations as a slice.
    pub fn as_slice(&self) -> &[MigrationOperation] {
        &self.0
    }

    /// Builds the sequence that undoes this one: every operation's inverse, in
    /// reverse order.
    ///
    /// Fails on the first operation (by index) that has no inverse.
    pub fn inverse(&self) -> Result<Self, NotInvertible> {
        let mut inverted = Vec::with_capacity(self.0.len());
        for (operation_index, op) in self.0.iter().enumerate() {
            let inverse = op.inverse().ok_or(NotInvertible {
                operation_index,
                kind: op.kind(),
            })?;
            inverted.push(inverse);
        }
        inverted.reverse();
        Ok(Self(inverted))
    }

    /// Reports operations that refer to a table or column which is only
    /// created later in this sequence.
    ///
    /// This never changes the sequence. The object may well exist before the
    /// migration runs, so a hazard is a hint to review, not an error. Drops
    /// are not checked: dropping something that the same migration recreates
    /// later is a normal pattern.
    pub fn ordering_hazards(&self) -> Vec<OrderingHazard> {
        let mut first_created: HashMap<SchemaReference, usize> = HashMap::new();
        for (index, op) in self.0.iter().enumerate() {
            for created in creates(op) {
                first_created.entry(created).or_insert(index);
            }
        }

        let mut hazards = Vec::new();
        let mut seen: HashSet<(usize, SchemaReference)> = HashSet::new();
        for (index, op) in self.0.iter().enumerate() {
            for reference in references(op) {
                let table = SchemaReference::Table(reference.table().to_string());
                let candidates = if matches!(reference, SchemaReference::Column { .. }) {
                    vec![table, reference]
                } else {
                    vec![reference]
                };
                for candidate in candidates {
                    if let Some(&created_at) = first_created.get(&candidate) {
                        if created_at > index && seen.insert((index, candidate.clone())) {
                            hazards.push(OrderingHazard {
                                operation_index: index,
                                created_at,
                                reference: candidate,
                            });
                        }
                    }
                }
            }
        }
        hazards
    }
}

impl From<Vec<MigrationOperation>> for OperationSequence {
    fn from(ops: Vec<MigrationOperation>) -> Self {
        Self(ops)
    }
}

impl FromIterator<MigrationOperation> for OperationSequence {
    fn from_iter<I: IntoIterator<Item = MigrationOperation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a OperationSequence {
    type Item = &'a MigrationOperation;
    type IntoIter = std::slice::Iter<'a, MigrationOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A table or column named by an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaReference {
    /// A table.
    Table(String),
    /// A column of a table.
    Column {
        /// The table.
        table: String,
        /// The column.
        column: String,
    },
}

impl SchemaReference {
    fn column(table: &str, column: &str) -> Self {
        Self::Column {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    /// Returns the table this reference belongs to.
    pub fn table(&self) -> &str {
        match self {
            Self::Table(table) | Self::Column { table, .. } => table,
        }
    }
}

impl fmt::Display for SchemaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(table) => write!(f, "table {table}"),
            Self::Column { table, column } => write!(f, "column {table}.{column}"),
        }
    }
}

/// An operation that refers to something created later in its sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderingHazard {
    /// The operation making the reference.
    pub operation_index: usize,
    /// The operation that creates the referenced object.
    pub created_at: usize,
    /// What is referenced.
    pub reference: SchemaReference,
}

impl fmt::Display for OrderingHazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation {} refers to {} which is created by operation {}",
            self.operation_index, self.reference, self.created_at
        )
    }
}

fn creates(op: &MigrationOperation) -> Vec<SchemaReference> {
    match op {
        MigrationOperation::CreateTable(op) => {
            let mut created = vec![SchemaReference::Table(op.table().to_string())];
            created.extend(
                op.columns()
                    .iter()
                    .map(|c| SchemaReference::column(op.table(), c.name())),
            );
            created
        }
        MigrationOperation::RenameTable(op) => {
            vec![SchemaReference::Table(op.new_name().to_string())]
        }
        MigrationOperation::AddColumn(op) => {
            vec![SchemaReference::column(op.table(), op.column().name())]
        }
        MigrationOperation::RenameColumn(op) => {
            vec![SchemaReference::column(op.table(), op.new_name())]
        }
        _ => Vec::new(),
    }
}

fn references(op: &MigrationOperation) -> Vec<SchemaReference> {
    let columns = |table: &str, columns: &[String]| -> Vec<SchemaReference> {
        columns
            .iter()
            .map(|c| SchemaReference::column(table, c))
            .collect()
    };
    let table = |table: &str| vec![SchemaReference::Table(table.to_string())];

    match op {
        MigrationOperation::CreateTable(_)
        | MigrationOperation::DropTable(_)
        | MigrationOperation::DropColumn(_)
        | MigrationOperation::Sql(_) => Vec::new(),
        MigrationOperation::AlterTable(op) => table(op.table()),
        MigrationOperation::RenameTable(op) => table(op.table()),
        MigrationOperation::AddColumn(op) => table(op.table()),
        MigrationOperation::AlterColumn(op) => {
            vec![SchemaReference::column(op.table(), op.column().name())]
        }
        MigrationOperation::RenameColumn(op) => {
            vec![SchemaReference::column(op.table(), op.column())]
        }
        MigrationOperation::CreateIndex(op) => columns(op.table(), op.columns()),
        MigrationOperation::DropIndex(op) => table(op.table()),
        MigrationOperation::RenameIndex(op) => table(op.table()),
        MigrationOperation::AddForeignKey(op) => {
            let mut refs = columns(op.table(), op.columns());
            refs.extend(columns(op.principal_table(), op.principal_columns()));
            refs
        }
        MigrationOperation::DropForeignKey(op) => table(op.table()),
        MigrationOperation::AddPrimaryKey(op) => columns(op.table(), op.columns()),
        MigrationOperation::DropPrimaryKey(op) => table(op.table()),
        MigrationOperation::InsertRows(op) => columns(op.table(), op.columns()),
        MigrationOperation::UpdateRows(op) => {
            let mut refs = columns(op.table(), op.key_columns());
            refs.extend(columns(op.table(), op.columns()));
            refs
        }
        MigrationOperation::DeleteRows(op) => {
            if op.columns().is_empty() {
                table(op.table())
            } else {
                columns(op.table(), op.columns())
            }
        }
    }
}

/// A named, ordered unit of change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Migration {
    id: MigrationId,
    operations: OperationSequence,
}

impl Migration {
    /// Creates a migration from an id and an already-built sequence.
    pub const fn new(id: MigrationId, operations: OperationSequence) -> Self {
        Self { id, operations }
    }

    /// Starts building a migration.
    pub const fn builder(id: MigrationId) -> MigrationBuilder {
        MigrationBuilder::new(id)
    }

    /// Returns the migration id.
    pub const fn id(&self) -> &MigrationId {
        &self.id
    }

    /// Returns the operations, in execution order.
    pub const fn operations(&self) -> &OperationSequence {
        &self.operations
    }
}

/// Collects operations, in the order given, into a [`Migration`].
///
/// # Examples
///
/// ```
/// use sqlshift_core::Value;
/// use sqlshift_migrations::operations::DeleteRows;
/// use sqlshift_migrations::{MigrationBuilder, MigrationId};
///
/// let migration = MigrationBuilder::new(MigrationId::new("0002_cleanup").unwrap())
///     .push(DeleteRows::new("sessions", ["expired"], vec![vec![Value::Bool(true)]]).unwrap())
///     .build();
/// assert_eq!(migration.operations().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MigrationBuilder {
    id: MigrationId,
    operations: Vec<MigrationOperation>,
}

impl MigrationBuilder {
    /// Creates a builder with no operations.
    pub const fn new(id: MigrationId) -> Self {
        Self {
            id,
            operations: Vec::new(),
        }
    }

    /// Appends one operation.
    #[must_use]
    pub fn push(mut self, op: impl Into<MigrationOperation>) -> Self {
        self.operations.push(op.into());
        self
    }

    /// Appends several operations, keeping their order.
    #[must_use]
    pub fn extend<I>(mut self, ops: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<MigrationOperation>,
    {
        self.operations.extend(ops.into_iter().map(Into::into));
        self
    }

    /// Finishes the migration.
    pub fn build(self) -> Migration {
        Migration {
            id: self.id,
            operations: OperationSequence(self.operations),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{
        AddColumn, ColumnModel, ColumnType, CreateIndex, CreateTable, DeleteRows, DropColumn,
        DropTable, InsertRows, OperationKind, RenameColumn, UpdateRows,
    };
    use sqlshift_core::Value;

    fn id(s: &str) -> MigrationId {
        MigrationId::new(s).unwrap()
    }

    fn col(name: &str) -> ColumnModel {
        ColumnModel::new(name, ColumnType::Int)
    }

    // ── MigrationId ─────────────────────────────────────────────────

    #[test]
    fn test_migration_id_validation() {
        assert_eq!(MigrationId::new(""), Err(MigrationIdError::Empty));
        assert_eq!(MigrationId::new(" \t"), Err(MigrationIdError::Empty));
        let long = "x".repeat(MAX_MIGRATION_ID_LEN + 1);
        assert!(matches!(
            MigrationId::new(long),
            Err(MigrationIdError::TooLong { len: 256, max: 255 })
        ));
        assert_eq!(id("0001").to_string(), "0001");
        assert_eq!(MigrationId::try_from("0001").unwrap(), id("0001"));
    }

    // ── Builder ─────────────────────────────────────────────────────

    #[test]
    fn test_builder_preserves_order_and_count() {
        let ops: Vec<MigrationOperation> = (0..25)
            .map(|i| {
                DeleteRows::new(format!("t{i}"), ["id"], vec![vec![Value::Int(i)]])
                    .unwrap()
                    .into()
            })
            .collect();
        let migration = MigrationBuilder::new(id("0001"))
            .extend(ops.clone())
            .build();
        assert_eq!(migration.operations().len(), ops.len());
        assert_eq!(migration.operations().as_slice(), ops.as_slice());
    }

    #[test]
    fn test_builder_keeps_duplicates() {
        let op = DropTable::new("users").unwrap();
        let migration = Migration::builder(id("0001"))
            .push(op.clone())
            .push(op)
            .build();
        assert_eq!(migration.operations().len(), 2);
    }

    // ── Inverse ─────────────────────────────────────────────────────

    #[test]
    fn test_inverse_reverses_order() {
        let seq: OperationSequence = vec![
            CreateTable::new("users", vec![col("id")]).unwrap().into(),
            AddColumn::new("users", col("age")).unwrap().into(),
        ]
        .into();
        let down = seq.inverse().unwrap();
        let kinds: Vec<_> = down.iter().map(Operation::kind).collect();
        assert_eq!(kinds, [OperationKind::DropColumn, OperationKind::DropTable]);
        assert_eq!(down.inverse().unwrap(), seq);
    }

    #[test]
    fn test_inverse_reports_first_non_invertible() {
        let seq: OperationSequence = vec![
            AddColumn::new("users", col("age")).unwrap().into(),
            DropColumn::new("users", "name").unwrap().into(),
            DeleteRows::new("users", ["id"], vec![]).unwrap().into(),
        ]
        .into();
        let err = seq.inverse().unwrap_err();
        assert_eq!(err.operation_index, 1);
        assert_eq!(err.kind, OperationKind::DropColumn);
    }

    // ── Ordering hazards ────────────────────────────────────────────

    #[test]
    fn test_no_hazards_when_ordered() {
        let seq: OperationSequence = vec![
            CreateTable::new("users", vec![col("id")]).unwrap().into(),
            AddColumn::new("users", col("age")).unwrap().into(),
            InsertRows::new("users", ["id", "age"], vec![vec![Value::Int(1), Value::Int(30)]])
                .unwrap()
                .into(),
        ]
        .into();
        assert!(seq.ordering_hazards().is_empty());
    }

    #[test]
    fn test_insert_before_add_column_is_hazard() {
        let seq: OperationSequence = vec![
            InsertRows::new("users", ["age"], vec![vec![Value::Int(30)]])
                .unwrap()
                .into(),
            AddColumn::new("users", col("age")).unwrap().into(),
        ]
        .into();
        let hazards = seq.ordering_hazards();
        assert_eq!(
            hazards,
            vec![OrderingHazard {
                operation_index: 0,
                created_at: 1,
                reference: SchemaReference::column("users", "age"),
            }]
        );
        assert!(hazards[0].to_string().contains("users.age"));
        // Never reorders.
        assert_eq!(seq.get(0).unwrap().kind(), OperationKind::InsertRows);
    }

    #[test]
    fn test_index_before_create_table_is_hazard() {
        let seq: OperationSequence = vec![
            CreateIndex::new("users", "ix", ["email"]).unwrap().into(),
            CreateTable::new("users", vec![col("email")]).unwrap().into(),
        ]
        .into();
        let hazards = seq.ordering_hazards();
        assert!(hazards
            .iter()
            .any(|h| h.reference == SchemaReference::Table("users".into())));
        assert!(hazards.iter().all(|h| h.created_at == 1));
    }

    #[test]
    fn test_multi_column_insert_reports_table_once() {
        let seq: OperationSequence = vec![
            InsertRows::new(
                "users",
                ["id", "name"],
                vec![vec![Value::Int(1), Value::from("Ada")]],
            )
            .unwrap()
            .into(),
            CreateTable::new("users", vec![col("id"), col("name")])
                .unwrap()
                .into(),
        ]
        .into();
        let hazards = seq.ordering_hazards();
        let at = |reference| OrderingHazard {
            operation_index: 0,
            created_at: 1,
            reference,
        };
        assert_eq!(
            hazards,
            vec![
                at(SchemaReference::Table("users".into())),
                at(SchemaReference::column("users", "id")),
                at(SchemaReference::column("users", "name")),
            ]
        );
    }

    #[test]
    fn test_update_after_rename_is_not_hazard() {
        let seq: OperationSequence = vec![
            RenameColumn::new("users", "name", "full_name").unwrap().into(),
            UpdateRows::new(
                "users",
                ["id"],
                vec![vec![Value::Int(1)]],
                ["full_name"],
                vec![vec![Value::from("Ada")]],
            )
            .unwrap()
            .into(),
        ]
        .into();
        assert!(seq.ordering_hazards().is_empty());
    }

    #[test]
    fn test_drop_then_recreate_is_not_hazard() {
        let seq: OperationSequence = vec![
            DropTable::new("users").unwrap().into(),
            CreateTable::new("users", vec![col("id")]).unwrap().into(),
        ]
        .into();
        assert!(seq.ordering_hazards().is_empty());
    }
}

//! The closed set of migration operations.
//!
//! Every schema or data change a migration can make is one variant of
//! [`MigrationOperation`]. Each variant wraps an immutable struct that checks
//! its fields when it is constructed: an operation that exists is valid. Fields
//! are private and exposed through read-only accessors.
//!
//! Operations carry no SQL. A [`SqlRenderer`](crate::render::SqlRenderer)
//! turns each one into statements for a particular database.
//!
//! ## Destructiveness
//!
//! Every operation answers [`Operation::is_destructive_change`] from its own
//! shape. "Destructive" tracks loss of schema structure, not of row data:
//! [`DeleteRows`] is never destructive even though it removes rows.

mod column;
mod index;
mod keys;
mod model;
mod rows;
mod sql;
mod table;

use serde::Serialize;

use crate::error::{ValidationError, Violation, ViolationKind};

pub use column::{AddColumn, AlterColumn, DropColumn, RenameColumn};
pub use index::{CreateIndex, DropIndex, RenameIndex};
pub use keys::{AddForeignKey, AddPrimaryKey, DropForeignKey, DropPrimaryKey};
pub use model::{ColumnModel, ColumnType, ReferentialAction};
pub use rows::{DeleteRows, InsertRows, UpdateRows};
pub use sql::Sql;
pub use table::{AlterTable, CreateTable, DropTable, RenameTable};

/// How an operation affects existing schema structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destructiveness {
    /// No schema structure is lost.
    NonDestructive,
    /// Schema structure (and the data held in it) may be lost irreversibly.
    Destructive,
    /// A schema object changes name; its data is kept. Code that refers to the
    /// old name will break, so callers may still want to review these.
    RenamePreserving,
}

/// Behavior shared by every operation variant.
pub trait Operation {
    /// Returns the variant's tag.
    fn kind(&self) -> OperationKind;

    /// Returns a human-readable description of this operation.
    fn describe(&self) -> String;

    /// Returns whether this operation may irreversibly discard schema
    /// structure. Fixed by the operation's shape.
    fn is_destructive_change(&self) -> bool;

    /// Returns the three-way classification used by the analyzer.
    fn destructiveness(&self) -> Destructiveness {
        if self.is_destructive_change() {
            Destructiveness::Destructive
        } else {
            Destructiveness::NonDestructive
        }
    }

    /// Returns the operation that undoes this one, if it is known.
    fn inverse(&self) -> Option<MigrationOperation>;
}

macro_rules! migration_operations {
    ($($variant:ident),+ $(,)?) => {
        /// The tag of a [`MigrationOperation`] variant.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum OperationKind {
            $(
                #[allow(missing_docs)]
                $variant,
            )+
        }

        impl OperationKind {
            /// Every operation kind, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the kind's name.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }
        }

        /// One schema or data change.
        ///
        /// The set of variants is closed; renderers match on it exhaustively.
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(tag = "operation")]
        pub enum MigrationOperation {
            $(
                #[allow(missing_docs)]
                $variant($variant),
            )+
        }

        impl MigrationOperation {
            fn as_operation(&self) -> &dyn Operation {
                match self {
                    $(Self::$variant(op) => op,)+
                }
            }
        }

        $(
            impl From<$variant> for MigrationOperation {
                fn from(op: $variant) -> Self {
                    Self::$variant(op)
                }
            }
        )+
    };
}

migration_operations!(
    CreateTable,
    AlterTable,
    DropTable,
    RenameTable,
    AddColumn,
    AlterColumn,
    DropColumn,
    RenameColumn,
    CreateIndex,
    DropIndex,
    RenameIndex,
    AddForeignKey,
    DropForeignKey,
    AddPrimaryKey,
    DropPrimaryKey,
    InsertRows,
    UpdateRows,
    DeleteRows,
    Sql,
);

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operation for MigrationOperation {
    fn kind(&self) -> OperationKind {
        self.as_operation().kind()
    }

    fn describe(&self) -> String {
        self.as_operation().describe()
    }

    fn is_destructive_change(&self) -> bool {
        self.as_operation().is_destructive_change()
    }

    fn destructiveness(&self) -> Destructiveness {
        self.as_operation().destructiveness()
    }

    fn inverse(&self) -> Option<MigrationOperation> {
        self.as_operation().inverse()
    }
}

impl MigrationOperation {
    /// Returns the table this operation targets, if it targets one.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::CreateTable(op) => Some(op.table()),
            Self::AlterTable(op) => Some(op.table()),
            Self::DropTable(op) => Some(op.table()),
            Self::RenameTable(op) => Some(op.table()),
            Self::AddColumn(op) => Some(op.table()),
            Self::AlterColumn(op) => Some(op.table()),
            Self::DropColumn(op) => Some(op.table()),
            Self::RenameColumn(op) => Some(op.table()),
            Self::CreateIndex(op) => Some(op.table()),
            Self::DropIndex(op) => Some(op.table()),
            Self::RenameIndex(op) => Some(op.table()),
            Self::AddForeignKey(op) => Some(op.table()),
            Self::DropForeignKey(op) => Some(op.table()),
            Self::AddPrimaryKey(op) => Some(op.table()),
            Self::DropPrimaryKey(op) => Some(op.table()),
            Self::InsertRows(op) => Some(op.table()),
            Self::UpdateRows(op) => Some(op.table()),
            Self::DeleteRows(op) => Some(op.table()),
            Self::Sql(_) => None,
        }
    }
}

/// Collects violations while an operation is being constructed.
pub(crate) struct Checker {
    operation: OperationKind,
    violations: Vec<Violation>,
}

impl Checker {
    pub(crate) const fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            violations: Vec::new(),
        }
    }

    fn push(&mut self, field: String, kind: ViolationKind) {
        self.violations.push(Violation { field, kind });
    }

    /// A required identifier or text.
    pub(crate) fn name(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field.to_string(), ViolationKind::Empty);
        }
        self
    }

    /// Identifiers in a list must each be non-empty. The list may be empty.
    pub(crate) fn names(&mut self, field: &str, values: &[String]) -> &mut Self {
        for (i, value) in values.iter().enumerate() {
            if value.trim().is_empty() {
                self.push(format!("{field}[{i}]"), ViolationKind::Empty);
            }
        }
        self
    }

    /// A required collection.
    pub(crate) fn non_empty<T>(&mut self, field: &str, values: &[T]) -> &mut Self {
        if values.is_empty() {
            self.push(field.to_string(), ViolationKind::EmptyCollection);
        }
        self
    }

    /// Two collections that must have the same length.
    pub(crate) fn arity(&mut self, field: &str, expected: usize, actual: usize) -> &mut Self {
        if expected != actual {
            self.push(
                field.to_string(),
                ViolationKind::MismatchedArity { expected, actual },
            );
        }
        self
    }

    pub(crate) fn finish(&mut self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                operation: self.operation,
                violations: std::mem::take(&mut self.violations),
            })
        }
    }
}

pub(crate) fn owned_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlshift_core::Value;

    fn sample_operations() -> Vec<MigrationOperation> {
        let id = ColumnModel::new("id", ColumnType::BigInt).not_null();
        vec![
            CreateTable::new("users", vec![id.clone()]).unwrap().into(),
            AlterTable::new("users", Some("people".to_string()))
                .unwrap()
                .into(),
            DropTable::new("users").unwrap().into(),
            RenameTable::new("users", "people").unwrap().into(),
            AddColumn::new("users", id.clone()).unwrap().into(),
            AlterColumn::new("users", id, false).unwrap().into(),
            DropColumn::new("users", "id").unwrap().into(),
            RenameColumn::new("users", "id", "user_id").unwrap().into(),
            CreateIndex::new("users", "ix_users_id", ["id"]).unwrap().into(),
            DropIndex::new("users", "ix_users_id").unwrap().into(),
            RenameIndex::new("users", "ix_a", "ix_b").unwrap().into(),
            AddForeignKey::new("posts", "fk_posts_users", ["user_id"], "users", ["id"])
                .unwrap()
                .into(),
            DropForeignKey::new("posts", "fk_posts_users").unwrap().into(),
            AddPrimaryKey::new("users", "pk_users", ["id"]).unwrap().into(),
            DropPrimaryKey::new("users", "pk_users").unwrap().into(),
            InsertRows::new("users", ["id"], vec![vec![Value::Int(1)]])
                .unwrap()
                .into(),
            UpdateRows::new(
                "users",
                ["id"],
                vec![vec![Value::Int(1)]],
                ["name"],
                vec![vec![Value::from("a")]],
            )
            .unwrap()
            .into(),
            DeleteRows::new("users", ["id"], vec![vec![Value::Int(1)]])
                .unwrap()
                .into(),
            Sql::new("SELECT 1").unwrap().into(),
        ]
    }

    #[test]
    fn test_every_kind_is_covered() {
        let kinds: Vec<OperationKind> = sample_operations().iter().map(Operation::kind).collect();
        assert_eq!(kinds, OperationKind::ALL);
    }

    #[test]
    fn test_destructiveness_is_fixed_by_shape() {
        for op in sample_operations() {
            let expected = match op.kind() {
                OperationKind::DropTable | OperationKind::DropColumn => Destructiveness::Destructive,
                OperationKind::RenameTable
                | OperationKind::RenameColumn
                | OperationKind::RenameIndex => Destructiveness::RenamePreserving,
                _ => Destructiveness::NonDestructive,
            };
            assert_eq!(op.destructiveness(), expected, "{}", op.describe());
            assert_eq!(
                op.is_destructive_change(),
                expected == Destructiveness::Destructive
            );
            assert_eq!(op.destructiveness(), op.clone().destructiveness());
        }
    }

    fn built<T: Into<MigrationOperation>>(
        result: Result<T, ValidationError>,
    ) -> Result<MigrationOperation, ValidationError> {
        result.map(Into::into)
    }

    #[test]
    fn test_empty_required_name_rejected_for_every_kind() {
        let id = ColumnModel::new("id", ColumnType::BigInt).not_null();
        let row = || vec![vec![Value::Int(1)]];
        let cases: Vec<(OperationKind, &str, Result<MigrationOperation, ValidationError>)> = vec![
            (OperationKind::CreateTable, "table", built(CreateTable::new("", vec![id.clone()]))),
            (OperationKind::AlterTable, "table", built(AlterTable::new("", None))),
            (OperationKind::DropTable, "table", built(DropTable::new(""))),
            (OperationKind::RenameTable, "table", built(RenameTable::new("", "people"))),
            (OperationKind::AddColumn, "table", built(AddColumn::new("", id.clone()))),
            (OperationKind::AlterColumn, "table", built(AlterColumn::new("", id.clone(), false))),
            (OperationKind::DropColumn, "table", built(DropColumn::new("", "id"))),
            (OperationKind::RenameColumn, "table", built(RenameColumn::new("", "id", "uid"))),
            (OperationKind::CreateIndex, "table", built(CreateIndex::new("", "ix", ["id"]))),
            (OperationKind::DropIndex, "table", built(DropIndex::new("", "ix"))),
            (OperationKind::RenameIndex, "table", built(RenameIndex::new("", "ix_a", "ix_b"))),
            (
                OperationKind::AddForeignKey,
                "table",
                built(AddForeignKey::new("", "fk", ["user_id"], "users", ["id"])),
            ),
            (OperationKind::DropForeignKey, "table", built(DropForeignKey::new("", "fk"))),
            (OperationKind::AddPrimaryKey, "table", built(AddPrimaryKey::new("", "pk", ["id"]))),
            (OperationKind::DropPrimaryKey, "table", built(DropPrimaryKey::new("", "pk"))),
            (OperationKind::InsertRows, "table", built(InsertRows::new("", ["id"], row()))),
            (
                OperationKind::UpdateRows,
                "table",
                built(UpdateRows::new("", ["id"], row(), ["name"], vec![vec![Value::from("a")]])),
            ),
            (OperationKind::DeleteRows, "table", built(DeleteRows::new("", ["id"], row()))),
            (OperationKind::Sql, "sql", built(Sql::new(""))),
        ];

        assert_eq!(cases.len(), OperationKind::ALL.len());
        let kinds: Vec<OperationKind> = cases.iter().map(|(kind, _, _)| *kind).collect();
        assert_eq!(kinds, OperationKind::ALL);

        for (kind, field, result) in cases {
            let err = result.unwrap_err();
            assert_eq!(err.operation, kind);
            assert!(err.has_violation(field, ViolationKind::Empty), "{kind}: {err}");
        }
    }

    #[test]
    fn test_table_accessor() {
        let ops = sample_operations();
        assert_eq!(ops[0].table(), Some("users"));
        assert_eq!(ops[11].table(), Some("posts"));
        assert_eq!(ops[18].table(), None);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(OperationKind::DeleteRows.to_string(), "DeleteRows");
        assert_eq!(OperationKind::ALL.len(), 19);
    }

    #[test]
    fn test_serialize_is_tagged() {
        let op: MigrationOperation = DeleteRows::new("users", ["id"], vec![vec![Value::Int(7)]])
            .unwrap()
            .into();
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["operation"], "DeleteRows");
        assert_eq!(json["table"], "users");
        assert_eq!(json["columns"][0], "id");
    }

    #[test]
    fn test_checker_collects_all_violations() {
        let err = Checker::new(OperationKind::AddForeignKey)
            .name("table", " ")
            .names("columns", &["a".into(), String::new()])
            .non_empty::<String>("principal_columns", &[])
            .arity("principal_columns", 2, 0)
            .finish()
            .unwrap_err();
        assert_eq!(err.violations.len(), 4);
        assert!(err.has_violation("table", ViolationKind::Empty));
        assert!(err.has_violation("columns[1]", ViolationKind::Empty));
        assert!(err.has_violation("principal_columns", ViolationKind::EmptyCollection));
    }
}

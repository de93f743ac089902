//! SQLite renderer.
//!
//! SQLite's `ALTER TABLE` only renames tables and columns, adds columns, and
//! drops columns (3.35+). Changing a column, renaming an index, and adding or
//! dropping constraints on an existing table all require rebuilding the table,
//! which this renderer does not do: those operations are reported as
//! [`RenderErrorKind::Unsupported`] so the run stops before touching the
//! database. Write the rebuild as raw [`Sql`](crate::operations::Sql)
//! operations instead.

use sqlshift_backends::DatabaseBackendType;

use super::syntax::{split_schema, Syntax};
use super::SqlRenderer;
use crate::error::RenderErrorKind;
use crate::operations::{
    ColumnModel, ColumnType, CreateTable, MigrationOperation, Operation, OperationKind,
};

const SQL: Syntax = Syntax::new(DatabaseBackendType::SQLite);

/// Renders operations for SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteRenderer;

impl SqliteRenderer {
    /// Returns the column definition that follows the column name.
    ///
    /// Identity columns become `INTEGER PRIMARY KEY AUTOINCREMENT`, which is
    /// only valid inside `CREATE TABLE`.
    pub fn column_sql(&self, column: &ColumnModel) -> Result<String, RenderErrorKind> {
        if column.is_identity() {
            return Ok("INTEGER PRIMARY KEY AUTOINCREMENT".to_string());
        }
        let type_str = sqlite_type_sql(column.column_type());
        let null_str = if column.is_nullable() { "" } else { " NOT NULL" };
        let default_str = SQL.default_clause(column)?;
        Ok(format!("{type_str}{null_str}{default_str}"))
    }

    fn create_table(&self, op: &CreateTable) -> Result<Vec<String>, RenderErrorKind> {
        let identities: Vec<&ColumnModel> =
            op.columns().iter().filter(|c| c.is_identity()).collect();
        let inline_key = match identities.as_slice() {
            [] => false,
            [identity]
                if op.primary_key().is_empty()
                    || matches!(op.primary_key(), [pk] if pk == identity.name()) =>
            {
                true
            }
            _ => return Err(unsupported(op.kind())),
        };

        let mut parts = op
            .columns()
            .iter()
            .map(|c| Ok(format!("{} {}", SQL.quote(c.name()), self.column_sql(c)?)))
            .collect::<Result<Vec<_>, RenderErrorKind>>()?;
        if !inline_key && !op.primary_key().is_empty() {
            parts.push(format!("PRIMARY KEY ({})", SQL.column_list(op.primary_key())));
        }
        Ok(vec![format!(
            "CREATE TABLE {} ({})",
            SQL.table(op.table()),
            parts.join(", ")
        )])
    }
}

impl SqlRenderer for SqliteRenderer {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    fn render(&self, op: &MigrationOperation) -> Result<Vec<String>, RenderErrorKind> {
        let stmts = match op {
            MigrationOperation::CreateTable(op) => self.create_table(op)?,
            // No table comments in SQLite.
            MigrationOperation::AlterTable(_) => Vec::new(),
            MigrationOperation::DropTable(op) => {
                vec![format!("DROP TABLE {}", SQL.table(op.table()))]
            }
            MigrationOperation::RenameTable(op) => vec![format!(
                "ALTER TABLE {} RENAME TO {}",
                SQL.table(op.table()),
                SQL.quote(op.new_name())
            )],
            MigrationOperation::AddColumn(op) => {
                if op.column().is_identity() {
                    return Err(unsupported(op.kind()));
                }
                vec![format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    SQL.table(op.table()),
                    SQL.quote(op.column().name()),
                    self.column_sql(op.column())?
                )]
            }
            MigrationOperation::DropColumn(op) => vec![format!(
                "ALTER TABLE {} DROP COLUMN {}",
                SQL.table(op.table()),
                SQL.quote(op.column())
            )],
            MigrationOperation::RenameColumn(op) => vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                SQL.table(op.table()),
                SQL.quote(op.column()),
                SQL.quote(op.new_name())
            )],
            MigrationOperation::CreateIndex(op) => {
                // The schema goes on the index name; the table stays bare.
                let (_, table) = split_schema(op.table());
                let unique = if op.is_unique() { "UNIQUE " } else { "" };
                vec![format!(
                    "CREATE {unique}INDEX {} ON {} ({})",
                    SQL.sibling(op.table(), op.name()),
                    SQL.quote(table),
                    SQL.column_list(op.columns())
                )]
            }
            MigrationOperation::DropIndex(op) => {
                vec![format!("DROP INDEX {}", SQL.sibling(op.table(), op.name()))]
            }
            MigrationOperation::AlterColumn(_)
            | MigrationOperation::RenameIndex(_)
            | MigrationOperation::AddForeignKey(_)
            | MigrationOperation::DropForeignKey(_)
            | MigrationOperation::AddPrimaryKey(_)
            | MigrationOperation::DropPrimaryKey(_) => return Err(unsupported(op.kind())),
            MigrationOperation::InsertRows(op) => SQL.insert_rows(op)?,
            MigrationOperation::UpdateRows(op) => SQL.update_rows(op)?,
            MigrationOperation::DeleteRows(op) => SQL.delete_rows(op)?,
            MigrationOperation::Sql(op) => vec![op.sql().to_string()],
        };
        Ok(stmts)
    }
}

const fn unsupported(operation: OperationKind) -> RenderErrorKind {
    RenderErrorKind::Unsupported {
        operation,
        dialect: "sqlite",
    }
}

/// Returns the SQLite type name for a column type.
fn sqlite_type_sql(column_type: ColumnType) -> String {
    match column_type {
        ColumnType::SmallInt | ColumnType::Int | ColumnType::BigInt | ColumnType::Bool => {
            "INTEGER".to_string()
        }
        ColumnType::Decimal { precision, scale } => format!("DECIMAL({precision}, {scale})"),
        ColumnType::Float | ColumnType::Double => "REAL".to_string(),
        ColumnType::String { max_length: Some(len) } => format!("VARCHAR({len})"),
        ColumnType::String { max_length: None }
        | ColumnType::Text
        | ColumnType::Date
        | ColumnType::Time
        | ColumnType::DateTime
        | ColumnType::DateTimeTz
        | ColumnType::Uuid
        | ColumnType::Json => "TEXT".to_string(),
        ColumnType::Binary { .. } => "BLOB".to_string(),
    }
}

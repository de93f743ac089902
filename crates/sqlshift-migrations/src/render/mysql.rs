//! MySQL renderer.
//!
//! MySQL commits implicitly before and after most DDL statements, so a
//! migration that mixes DDL with a failing later statement cannot be fully
//! rolled back there. Keep DDL-heavy MySQL migrations small.

use sqlshift_backends::DatabaseBackendType;

use super::syntax::Syntax;
use super::SqlRenderer;
use crate::error::RenderErrorKind;
use crate::operations::{ColumnModel, ColumnType, MigrationOperation};

const SQL: Syntax = Syntax::new(DatabaseBackendType::MySQL);

/// Renders operations for MySQL.
///
/// Uses `AUTO_INCREMENT`, `TINYINT(1)` for booleans, the `JSON` type, and
/// `MODIFY COLUMN` for alterations.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlRenderer;

impl MySqlRenderer {
    /// Returns the column definition that follows the column name.
    pub fn column_sql(&self, column: &ColumnModel) -> Result<String, RenderErrorKind> {
        let type_str = mysql_type_sql(column.column_type());
        let null_str = if column.is_nullable() { " NULL" } else { " NOT NULL" };
        let auto_inc = if column.is_identity() { " AUTO_INCREMENT" } else { "" };
        let default_str = if column.is_identity() {
            String::new()
        } else {
            SQL.default_clause(column)?
        };
        Ok(format!("{type_str}{null_str}{auto_inc}{default_str}"))
    }

    fn column_def(&self, column: &ColumnModel) -> Result<String, RenderErrorKind> {
        Ok(format!("{} {}", SQL.quote(column.name()), self.column_sql(column)?))
    }
}

impl SqlRenderer for MySqlRenderer {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::MySQL
    }

    fn render(&self, op: &MigrationOperation) -> Result<Vec<String>, RenderErrorKind> {
        let stmts = match op {
            MigrationOperation::CreateTable(op) => {
                let mut parts = op
                    .columns()
                    .iter()
                    .map(|c| self.column_def(c))
                    .collect::<Result<Vec<_>, _>>()?;
                if !op.primary_key().is_empty() {
                    parts.push(format!("PRIMARY KEY ({})", SQL.column_list(op.primary_key())));
                }
                vec![format!(
                    "CREATE TABLE {} ({})",
                    SQL.table(op.table()),
                    parts.join(", ")
                )]
            }
            MigrationOperation::AlterTable(op) => vec![format!(
                "ALTER TABLE {} COMMENT = {}",
                SQL.table(op.table()),
                SQL.string(op.comment().unwrap_or_default())
            )],
            MigrationOperation::DropTable(op) => {
                vec![format!("DROP TABLE {}", SQL.table(op.table()))]
            }
            MigrationOperation::RenameTable(op) => vec![format!(
                "RENAME TABLE {} TO {}",
                SQL.table(op.table()),
                SQL.sibling(op.table(), op.new_name())
            )],
            MigrationOperation::AddColumn(op) => vec![format!(
                "ALTER TABLE {} ADD COLUMN {}",
                SQL.table(op.table()),
                self.column_def(op.column())?
            )],
            MigrationOperation::AlterColumn(op) => vec![format!(
                "ALTER TABLE {} MODIFY COLUMN {}",
                SQL.table(op.table()),
                self.column_def(op.column())?
            )],
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
                let unique = if op.is_unique() { "UNIQUE " } else { "" };
                vec![format!(
                    "CREATE {unique}INDEX {} ON {} ({})",
                    SQL.quote(op.name()),
                    SQL.table(op.table()),
                    SQL.column_list(op.columns())
                )]
            }
            MigrationOperation::DropIndex(op) => vec![format!(
                "DROP INDEX {} ON {}",
                SQL.quote(op.name()),
                SQL.table(op.table())
            )],
            MigrationOperation::RenameIndex(op) => vec![format!(
                "ALTER TABLE {} RENAME INDEX {} TO {}",
                SQL.table(op.table()),
                SQL.quote(op.name()),
                SQL.quote(op.new_name())
            )],
            MigrationOperation::AddForeignKey(op) => vec![format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
                SQL.table(op.table()),
                SQL.quote(op.name()),
                SQL.column_list(op.columns()),
                SQL.table(op.principal_table()),
                SQL.column_list(op.principal_columns()),
                op.on_delete_action().as_sql()
            )],
            MigrationOperation::DropForeignKey(op) => vec![format!(
                "ALTER TABLE {} DROP FOREIGN KEY {}",
                SQL.table(op.table()),
                SQL.quote(op.name())
            )],
            // MySQL always names the primary key PRIMARY.
            MigrationOperation::AddPrimaryKey(op) => vec![format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                SQL.table(op.table()),
                SQL.column_list(op.columns())
            )],
            MigrationOperation::DropPrimaryKey(op) => vec![format!(
                "ALTER TABLE {} DROP PRIMARY KEY",
                SQL.table(op.table())
            )],
            MigrationOperation::InsertRows(op) => SQL.insert_rows(op)?,
            MigrationOperation::UpdateRows(op) => SQL.update_rows(op)?,
            MigrationOperation::DeleteRows(op) => SQL.delete_rows(op)?,
            MigrationOperation::Sql(op) => vec![op.sql().to_string()],
        };
        Ok(stmts)
    }
}

/// Returns the MySQL type name for a column type.
fn mysql_type_sql(column_type: ColumnType) -> String {
    match column_type {
        ColumnType::SmallInt => "SMALLINT".to_string(),
        ColumnType::Int => "INT".to_string(),
        ColumnType::BigInt => "BIGINT".to_string(),
        ColumnType::Bool => "TINYINT(1)".to_string(),
        ColumnType::Decimal { precision, scale } => format!("DECIMAL({precision}, {scale})"),
        ColumnType::Float => "FLOAT".to_string(),
        ColumnType::Double => "DOUBLE".to_string(),
        ColumnType::String { max_length } => format!("VARCHAR({})", max_length.unwrap_or(255)),
        ColumnType::Text => "LONGTEXT".to_string(),
        ColumnType::Binary { max_length: Some(len) } => format!("VARBINARY({len})"),
        ColumnType::Binary { max_length: None } => "LONGBLOB".to_string(),
        ColumnType::Date => "DATE".to_string(),
        ColumnType::Time => "TIME(6)".to_string(),
        ColumnType::DateTime | ColumnType::DateTimeTz => "DATETIME(6)".to_string(),
        ColumnType::Uuid => "CHAR(36)".to_string(),
        ColumnType::Json => "JSON".to_string(),
    }
}

//! PostgreSQL renderer.

use sqlshift_backends::DatabaseBackendType;

use super::syntax::Syntax;
use super::SqlRenderer;
use crate::error::RenderErrorKind;
use crate::operations::{ColumnModel, ColumnType, MigrationOperation};

const SQL: Syntax = Syntax::new(DatabaseBackendType::PostgreSQL);

/// Renders operations for PostgreSQL.
///
/// Uses `GENERATED BY DEFAULT AS IDENTITY` for identity columns, `JSONB`,
/// native `UUID`, `TIMESTAMPTZ`, and the full `ALTER COLUMN` syntax. DDL is
/// transactional on PostgreSQL, so a failed migration leaves no trace.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresRenderer;

impl PostgresRenderer {
    /// Returns the column definition that follows the column name.
    pub fn column_sql(&self, column: &ColumnModel) -> Result<String, RenderErrorKind> {
        let type_str = pg_type_sql(column.column_type());
        if column.is_identity() {
            return Ok(format!("{type_str} GENERATED BY DEFAULT AS IDENTITY"));
        }
        let null_str = if column.is_nullable() { "" } else { " NOT NULL" };
        let default_str = SQL.default_clause(column)?;
        Ok(format!("{type_str}{null_str}{default_str}"))
    }

    fn column_def(&self, column: &ColumnModel) -> Result<String, RenderErrorKind> {
        Ok(format!("{} {}", SQL.quote(column.name()), self.column_sql(column)?))
    }
}

impl SqlRenderer for PostgresRenderer {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::PostgreSQL
    }

    #[allow(clippy::too_many_lines)]
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
            MigrationOperation::AlterTable(op) => {
                let comment = op.comment().map_or_else(|| "NULL".to_string(), |c| SQL.string(c));
                vec![format!(
                    "COMMENT ON TABLE {} IS {comment}",
                    SQL.table(op.table())
                )]
            }
            MigrationOperation::DropTable(op) => {
                vec![format!("DROP TABLE {}", SQL.table(op.table()))]
            }
            MigrationOperation::RenameTable(op) => vec![format!(
                "ALTER TABLE {} RENAME TO {}",
                SQL.table(op.table()),
                SQL.quote(op.new_name())
            )],
            MigrationOperation::AddColumn(op) => vec![format!(
                "ALTER TABLE {} ADD COLUMN {}",
                SQL.table(op.table()),
                self.column_def(op.column())?
            )],
            MigrationOperation::AlterColumn(op) => {
                let table = SQL.table(op.table());
                let column = op.column();
                let col = SQL.quote(column.name());
                let type_sql = pg_type_sql(column.column_type());
                let mut stmts = vec![format!(
                    "ALTER TABLE {table} ALTER COLUMN {col} TYPE {type_sql}"
                )];
                if column.is_nullable() {
                    stmts.push(format!("ALTER TABLE {table} ALTER COLUMN {col} DROP NOT NULL"));
                } else {
                    stmts.push(format!("ALTER TABLE {table} ALTER COLUMN {col} SET NOT NULL"));
                }
                // Identity columns cannot carry a default.
                if !column.is_identity() {
                    let default = SQL.default_clause(column)?;
                    if default.is_empty() {
                        stmts.push(format!("ALTER TABLE {table} ALTER COLUMN {col} DROP DEFAULT"));
                    } else {
                        stmts.push(format!(
                            "ALTER TABLE {table} ALTER COLUMN {col} SET{default}"
                        ));
                    }
                }
                stmts
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
                let unique = if op.is_unique() { "UNIQUE " } else { "" };
                vec![format!(
                    "CREATE {unique}INDEX {} ON {} ({})",
                    SQL.quote(op.name()),
                    SQL.table(op.table()),
                    SQL.column_list(op.columns())
                )]
            }
            MigrationOperation::DropIndex(op) => {
                vec![format!("DROP INDEX {}", SQL.sibling(op.table(), op.name()))]
            }
            MigrationOperation::RenameIndex(op) => vec![format!(
                "ALTER INDEX {} RENAME TO {}",
                SQL.sibling(op.table(), op.name()),
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
                "ALTER TABLE {} DROP CONSTRAINT {}",
                SQL.table(op.table()),
                SQL.quote(op.name())
            )],
            MigrationOperation::AddPrimaryKey(op) => vec![format!(
                "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                SQL.table(op.table()),
                SQL.quote(op.name()),
                SQL.column_list(op.columns())
            )],
            MigrationOperation::DropPrimaryKey(op) => vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                SQL.table(op.table()),
                SQL.quote(op.name())
            )],
            MigrationOperation::InsertRows(op) => SQL.insert_rows(op)?,
            MigrationOperation::UpdateRows(op) => SQL.update_rows(op)?,
            MigrationOperation::DeleteRows(op) => SQL.delete_rows(op)?,
            MigrationOperation::Sql(op) => vec![op.sql().to_string()],
        };
        Ok(stmts)
    }
}

/// Returns the PostgreSQL type name for a column type.
fn pg_type_sql(column_type: ColumnType) -> String {
    match column_type {
        ColumnType::SmallInt => "SMALLINT".to_string(),
        ColumnType::Int => "INTEGER".to_string(),
        ColumnType::BigInt => "BIGINT".to_string(),
        ColumnType::Bool => "BOOLEAN".to_string(),
        ColumnType::Decimal { precision, scale } => format!("NUMERIC({precision}, {scale})"),
        ColumnType::Float => "REAL".to_string(),
        ColumnType::Double => "DOUBLE PRECISION".to_string(),
        ColumnType::String { max_length } => match max_length {
            Some(len) => format!("VARCHAR({len})"),
            None => "VARCHAR".to_string(),
        },
        ColumnType::Text => "TEXT".to_string(),
        ColumnType::Binary { .. } => "BYTEA".to_string(),
        ColumnType::Date => "DATE".to_string(),
        ColumnType::Time => "TIME".to_string(),
        ColumnType::DateTime => "TIMESTAMP".to_string(),
        ColumnType::DateTimeTz => "TIMESTAMPTZ".to_string(),
        ColumnType::Uuid => "UUID".to_string(),
        ColumnType::Json => "JSONB".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{
        AddColumn, AddForeignKey, AddPrimaryKey, AlterColumn, AlterTable, CreateIndex,
        CreateTable, DropForeignKey, DropIndex, DropPrimaryKey, DropTable, ReferentialAction,
        RenameColumn, RenameIndex, RenameTable,
    };

    fn render(op: impl Into<MigrationOperation>) -> Vec<String> {
        PostgresRenderer.render(&op.into()).unwrap()
    }

    // ── column_sql ──────────────────────────────────────────────────

    #[test]
    fn test_pg_column_sql_identity() {
        let col = ColumnModel::new("id", ColumnType::BigInt).identity();
        assert_eq!(
            PostgresRenderer.column_sql(&col).unwrap(),
            "BIGINT GENERATED BY DEFAULT AS IDENTITY"
        );
    }

    #[test]
    fn test_pg_column_sql_types() {
        let cases = [
            (ColumnType::String { max_length: Some(100) }, "VARCHAR(100)"),
            (ColumnType::Decimal { precision: 10, scale: 2 }, "NUMERIC(10, 2)"),
            (ColumnType::Json, "JSONB"),
            (ColumnType::DateTimeTz, "TIMESTAMPTZ"),
            (ColumnType::Binary { max_length: Some(16) }, "BYTEA"),
        ];
        for (ty, expected) in cases {
            let col = ColumnModel::new("c", ty);
            assert_eq!(PostgresRenderer.column_sql(&col).unwrap(), expected);
        }
    }

    #[test]
    fn test_pg_column_sql_not_null_default() {
        let col = ColumnModel::new("active", ColumnType::Bool)
            .not_null()
            .default_value(true);
        assert_eq!(
            PostgresRenderer.column_sql(&col).unwrap(),
            "BOOLEAN NOT NULL DEFAULT TRUE"
        );
    }

    // ── Tables ──────────────────────────────────────────────────────

    #[test]
    fn test_pg_create_table() {
        let op = CreateTable::new(
            "app.users",
            vec![
                ColumnModel::new("id", ColumnType::BigInt).identity(),
                ColumnModel::new("email", ColumnType::String { max_length: Some(254) }).not_null(),
            ],
        )
        .unwrap()
        .with_primary_key(["id"])
        .unwrap();
        assert_eq!(
            render(op),
            vec![
                "CREATE TABLE \"app\".\"users\" (\"id\" BIGINT GENERATED BY DEFAULT AS IDENTITY, \
                 \"email\" VARCHAR(254) NOT NULL, PRIMARY KEY (\"id\"))"
            ]
        );
    }

    #[test]
    fn test_pg_table_comment_and_rename() {
        assert_eq!(
            render(AlterTable::new("users", Some("It's people".into())).unwrap()),
            vec!["COMMENT ON TABLE \"users\" IS 'It''s people'"]
        );
        assert_eq!(
            render(AlterTable::new("users", None).unwrap()),
            vec!["COMMENT ON TABLE \"users\" IS NULL"]
        );
        assert_eq!(
            render(RenameTable::new("app.users", "people").unwrap()),
            vec!["ALTER TABLE \"app\".\"users\" RENAME TO \"people\""]
        );
        assert_eq!(render(DropTable::new("users").unwrap()), vec!["DROP TABLE \"users\""]);
    }

    // ── Columns ─────────────────────────────────────────────────────

    #[test]
    fn test_pg_add_and_rename_column() {
        assert_eq!(
            render(AddColumn::new("users", ColumnModel::new("age", ColumnType::Int)).unwrap()),
            vec!["ALTER TABLE \"users\" ADD COLUMN \"age\" INTEGER"]
        );
        assert_eq!(
            render(RenameColumn::new("users", "name", "full_name").unwrap()),
            vec!["ALTER TABLE \"users\" RENAME COLUMN \"name\" TO \"full_name\""]
        );
    }

    #[test]
    fn test_pg_alter_column() {
        let col = ColumnModel::new("age", ColumnType::SmallInt)
            .not_null()
            .default_value(0);
        let stmts = render(AlterColumn::new("users", col, true).unwrap());
        assert_eq!(
            stmts,
            vec![
                "ALTER TABLE \"users\" ALTER COLUMN \"age\" TYPE SMALLINT",
                "ALTER TABLE \"users\" ALTER COLUMN \"age\" SET NOT NULL",
                "ALTER TABLE \"users\" ALTER COLUMN \"age\" SET DEFAULT 0",
            ]
        );

        let col = ColumnModel::new("age", ColumnType::Int);
        let stmts = render(AlterColumn::new("users", col, false).unwrap());
        assert!(stmts[1].ends_with("DROP NOT NULL"));
        assert!(stmts[2].ends_with("DROP DEFAULT"));
    }

    // ── Indexes and constraints ─────────────────────────────────────

    #[test]
    fn test_pg_indexes() {
        assert_eq!(
            render(
                CreateIndex::new("users", "ux_email", ["email"])
                    .unwrap()
                    .unique()
            ),
            vec!["CREATE UNIQUE INDEX \"ux_email\" ON \"users\" (\"email\")"]
        );
        assert_eq!(
            render(DropIndex::new("app.users", "ix").unwrap()),
            vec!["DROP INDEX \"app\".\"ix\""]
        );
        assert_eq!(
            render(RenameIndex::new("users", "ix_a", "ix_b").unwrap()),
            vec!["ALTER INDEX \"ix_a\" RENAME TO \"ix_b\""]
        );
    }

    #[test]
    fn test_pg_constraints() {
        let fk = AddForeignKey::new("posts", "fk_posts_user", ["user_id"], "users", ["id"])
            .unwrap()
            .on_delete(ReferentialAction::Cascade);
        assert_eq!(
            render(fk),
            vec![
                "ALTER TABLE \"posts\" ADD CONSTRAINT \"fk_posts_user\" FOREIGN KEY (\"user_id\") \
                 REFERENCES \"users\" (\"id\") ON DELETE CASCADE"
            ]
        );
        assert_eq!(
            render(DropForeignKey::new("posts", "fk_posts_user").unwrap()),
            vec!["ALTER TABLE \"posts\" DROP CONSTRAINT \"fk_posts_user\""]
        );
        assert_eq!(
            render(AddPrimaryKey::new("t", "pk_t", ["a", "b"]).unwrap()),
            vec!["ALTER TABLE \"t\" ADD CONSTRAINT \"pk_t\" PRIMARY KEY (\"a\", \"b\")"]
        );
        assert_eq!(
            render(DropPrimaryKey::new("t", "pk_t").unwrap()),
            vec!["ALTER TABLE \"t\" DROP CONSTRAINT \"pk_t\""]
        );
    }
}

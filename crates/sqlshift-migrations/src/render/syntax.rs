//! SQL text building shared by the dialect renderers.
//!
//! Identifier quoting, literal formatting, and the row-level statements
//! (`INSERT`, `UPDATE`, `DELETE`) differ between dialects only in quoting and
//! literal details, so they live here and are parameterized by
//! [`DatabaseBackendType`].

use std::fmt::Write as _;

use sqlshift_backends::DatabaseBackendType;
use sqlshift_core::Value;

use crate::error::RenderErrorKind;
use crate::operations::{ColumnModel, DeleteRows, InsertRows, UpdateRows};

const NAIVE_DATETIME: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Clone, Copy)]
pub(crate) struct Syntax {
    dialect: DatabaseBackendType,
}

impl Syntax {
    pub(crate) const fn new(dialect: DatabaseBackendType) -> Self {
        Self { dialect }
    }

    const fn quote_char(self) -> char {
        match self.dialect {
            DatabaseBackendType::MySQL => '`',
            DatabaseBackendType::PostgreSQL | DatabaseBackendType::SQLite => '"',
        }
    }

    /// Quotes one identifier, doubling any embedded quote character.
    pub(crate) fn quote(self, ident: &str) -> String {
        let q = self.quote_char();
        let mut out = String::with_capacity(ident.len() + 2);
        out.push(q);
        for ch in ident.chars() {
            if ch == q {
                out.push(q);
            }
            out.push(ch);
        }
        out.push(q);
        out
    }

    /// Quotes a possibly schema-qualified table name (`schema.table`).
    pub(crate) fn table(self, name: &str) -> String {
        let (schema, table) = split_schema(name);
        self.sibling_of(schema, table)
    }

    /// Quotes a name in the same schema as `table`.
    pub(crate) fn sibling(self, table: &str, name: &str) -> String {
        let (schema, _) = split_schema(table);
        self.sibling_of(schema, name)
    }

    fn sibling_of(self, schema: Option<&str>, name: &str) -> String {
        match schema {
            Some(schema) => {
                let mut out = schema
                    .split('.')
                    .map(|part| self.quote(part))
                    .collect::<Vec<_>>()
                    .join(".");
                out.push('.');
                out.push_str(&self.quote(name));
                out
            }
            None => self.quote(name),
        }
    }

    pub(crate) fn column_list(self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn string(self, s: &str) -> String {
        let mut escaped = s.replace('\'', "''");
        if self.dialect == DatabaseBackendType::MySQL {
            escaped = escaped.replace('\\', "\\\\");
        }
        format!("'{escaped}'")
    }

    /// Formats `value` as a literal for `column`.
    pub(crate) fn literal(self, column: &str, value: &Value) -> Result<String, RenderErrorKind> {
        let sql = match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match (self.dialect, b) {
                (DatabaseBackendType::PostgreSQL, true) => "TRUE".to_string(),
                (DatabaseBackendType::PostgreSQL, false) => "FALSE".to_string(),
                (_, true) => "1".to_string(),
                (_, false) => "0".to_string(),
            },
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if !f.is_finite() {
                    return Err(RenderErrorKind::InvalidValue {
                        column: column.to_string(),
                        reason: format!("{f} has no SQL literal"),
                    });
                }
                f.to_string()
            }
            Value::String(s) => self.string(s),
            Value::Bytes(bytes) => {
                let mut hex = String::with_capacity(bytes.len() * 2);
                for b in bytes {
                    let _ = write!(hex, "{b:02x}");
                }
                match self.dialect {
                    DatabaseBackendType::PostgreSQL => format!("'\\x{hex}'"),
                    DatabaseBackendType::SQLite | DatabaseBackendType::MySQL => {
                        format!("X'{hex}'")
                    }
                }
            }
            Value::Date(d) => self.string(&d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => self.string(&t.format("%H:%M:%S%.f").to_string()),
            Value::DateTime(dt) => self.string(&dt.format(NAIVE_DATETIME).to_string()),
            Value::DateTimeTz(dt) => match self.dialect {
                // MySQL DATETIME has no offset; store the UTC wall time.
                DatabaseBackendType::MySQL => {
                    self.string(&dt.naive_utc().format(NAIVE_DATETIME).to_string())
                }
                DatabaseBackendType::PostgreSQL | DatabaseBackendType::SQLite => self.string(
                    &dt.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
                ),
            },
            Value::Uuid(u) => self.string(&u.to_string()),
            Value::Json(j) => self.string(&j.to_string()),
        };
        Ok(sql)
    }

    /// The ` DEFAULT ...` clause for a column, or an empty string.
    pub(crate) fn default_clause(self, column: &ColumnModel) -> Result<String, RenderErrorKind> {
        if let Some(expr) = column.default_expression() {
            return Ok(format!(" DEFAULT {expr}"));
        }
        match column.default() {
            Some(value) => Ok(format!(" DEFAULT {}", self.literal(column.name(), value)?)),
            None => Ok(String::new()),
        }
    }

    /// `col = lit AND ...`, using `IS NULL` for NULL values.
    fn predicate(
        self,
        columns: &[String],
        values: &[Value],
        row: usize,
    ) -> Result<String, RenderErrorKind> {
        check_arity(row, columns.len(), values.len())?;
        columns
            .iter()
            .zip(values)
            .map(|(column, value)| {
                if value.is_null() {
                    Ok(format!("{} IS NULL", self.quote(column)))
                } else {
                    Ok(format!("{} = {}", self.quote(column), self.literal(column, value)?))
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.join(" AND "))
    }

    pub(crate) fn insert_rows(self, op: &InsertRows) -> Result<Vec<String>, RenderErrorKind> {
        let table = self.table(op.table());
        let columns = self.column_list(op.columns());
        op.values()
            .iter()
            .enumerate()
            .map(|(row, values)| {
                check_arity(row, op.columns().len(), values.len())?;
                let literals = op
                    .columns()
                    .iter()
                    .zip(values)
                    .map(|(column, value)| self.literal(column, value))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!(
                    "INSERT INTO {table} ({columns}) VALUES ({})",
                    literals.join(", ")
                ))
            })
            .collect()
    }

    pub(crate) fn update_rows(self, op: &UpdateRows) -> Result<Vec<String>, RenderErrorKind> {
        let table = self.table(op.table());
        if op.key_columns().is_empty() {
            tracing::warn!(table = %op.table(), "update has no key columns and applies to every row");
        }
        op.values()
            .iter()
            .zip(op.key_values())
            .enumerate()
            .map(|(row, (values, keys))| {
                check_arity(row, op.columns().len(), values.len())?;
                let assignments = op
                    .columns()
                    .iter()
                    .zip(values)
                    .map(|(column, value)| {
                        Ok(format!("{} = {}", self.quote(column), self.literal(column, value)?))
                    })
                    .collect::<Result<Vec<_>, RenderErrorKind>>()?
                    .join(", ");
                let predicate = self.predicate(op.key_columns(), keys, row)?;
                if predicate.is_empty() {
                    Ok(format!("UPDATE {table} SET {assignments}"))
                } else {
                    Ok(format!("UPDATE {table} SET {assignments} WHERE {predicate}"))
                }
            })
            .collect()
    }

    /// One `DELETE` per key tuple, in tuple order.
    pub(crate) fn delete_rows(self, op: &DeleteRows) -> Result<Vec<String>, RenderErrorKind> {
        let table = self.table(op.table());
        op.values()
            .iter()
            .enumerate()
            .map(|(row, values)| {
                let predicate = self.predicate(op.columns(), values, row)?;
                if predicate.is_empty() {
                    tracing::warn!(table = %op.table(), "deleting every row: no key columns given");
                    Ok(format!("DELETE FROM {table}"))
                } else {
                    Ok(format!("DELETE FROM {table} WHERE {predicate}"))
                }
            })
            .collect()
    }
}

/// Splits `schema.table` into its parts. The last dot separates, so the
/// qualifier of `db.app.users` is `db.app`.
pub(crate) fn split_schema(table: &str) -> (Option<&str>, &str) {
    match table.rsplit_once('.') {
        Some((schema, name)) => (Some(schema), name),
        None => (None, table),
    }
}

const fn check_arity(row: usize, expected: usize, actual: usize) -> Result<(), RenderErrorKind> {
    if expected == actual {
        Ok(())
    } else {
        Err(RenderErrorKind::ArityMismatch {
            row,
            expected,
            actual,
        })
    }
}

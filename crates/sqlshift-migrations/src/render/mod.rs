//! The SQL rendering protocol.
//!
//! A [`SqlRenderer`] turns one [`MigrationOperation`] into an ordered list of
//! statements for one database. Dispatch is an exhaustive `match` over the
//! operation enum, so adding a variant fails to compile until every renderer
//! handles it. Each renderer reads only the fields the operation exposes
//! through its accessors.
//!
//! [`render_sequence`] renders a whole sequence before anything runs. If any
//! operation fails to render, nothing is returned, so nothing reaches the
//! database.

mod mysql;
mod postgres;
mod sqlite;
pub(crate) mod syntax;

use serde::Serialize;
use sqlshift_backends::DatabaseBackendType;
use sqlshift_core::ShiftError;

use crate::error::{RenderError, RenderErrorKind};
use crate::migration::OperationSequence;
use crate::operations::MigrationOperation;

pub use mysql::MySqlRenderer;
pub use postgres::PostgresRenderer;
pub use sqlite::SqliteRenderer;

/// Renders migration operations to SQL for one database dialect.
///
/// Implementations return zero or more statements per operation. Zero is a
/// valid answer for an operation that is a no-op on the dialect.
pub trait SqlRenderer: Send + Sync {
    /// Returns the dialect this renderer targets.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Renders one operation.
    fn render(&self, op: &MigrationOperation) -> Result<Vec<String>, RenderErrorKind>;
}

/// One rendered statement and the operation it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedStatement {
    /// Index of the source operation in its sequence.
    pub operation_index: usize,
    /// The SQL text.
    pub sql: String,
}

/// Renders every operation of `sequence`, in order, into one flat list.
///
/// Statements from operation `i` always come after those from operations
/// before `i`. The first failure aborts the whole render and is tagged with
/// the failing operation's index.
pub fn render_sequence(
    renderer: &dyn SqlRenderer,
    sequence: &OperationSequence,
) -> Result<Vec<RenderedStatement>, RenderError> {
    let mut statements = Vec::with_capacity(sequence.len());
    for (operation_index, op) in sequence.iter().enumerate() {
        let rendered = renderer
            .render(op)
            .map_err(|reason| RenderError {
                operation_index,
                reason,
            })?;
        statements.extend(rendered.into_iter().map(|sql| RenderedStatement {
            operation_index,
            sql,
        }));
    }
    Ok(statements)
}

/// Returns the renderer for a backend type.
pub fn renderer(backend: DatabaseBackendType) -> Box<dyn SqlRenderer> {
    match backend {
        DatabaseBackendType::PostgreSQL => Box::new(PostgresRenderer),
        DatabaseBackendType::SQLite => Box::new(SqliteRenderer),
        DatabaseBackendType::MySQL => Box::new(MySqlRenderer),
    }
}

/// Returns the renderer for an engine or dialect name from settings.
///
/// # Examples
///
/// ```
/// use sqlshift_migrations::render::renderer_for;
///
/// assert!(renderer_for("postgres").is_ok());
/// assert!(renderer_for("oracle").is_err());
/// ```
pub fn renderer_for(engine: &str) -> Result<Box<dyn SqlRenderer>, ShiftError> {
    DatabaseBackendType::from_engine(engine)
        .map(renderer)
        .ok_or_else(|| ShiftError::Configuration(format!("unknown SQL dialect: {engine:?}")))
}

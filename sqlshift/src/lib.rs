//! # sqlshift
//!
//! Provider-agnostic schema and data migrations.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on `sqlshift`
//! and enable the feature for each database you target (`sqlite` is on by
//! default, `postgres` and `mysql` are opt-in), or depend on the individual
//! crates directly.
//!
//! ```
//! use sqlshift::prelude::*;
//! use sqlshift::migrations::operations::{ColumnModel, ColumnType, CreateTable};
//!
//! let migration = MigrationBuilder::new(MigrationId::new("0001_initial").unwrap())
//!     .push(CreateTable::new("users", vec![ColumnModel::new("id", ColumnType::BigInt)]).unwrap())
//!     .build();
//! let executor = MigrationExecutor::new(Box::new(SqliteRenderer));
//! assert_eq!(executor.script(&migration).unwrap().len(), 1);
//! ```

/// Errors, values, settings, and logging.
pub use sqlshift_core as core;

/// Database execution channels: `PostgreSQL`, `MySQL`, `SQLite`, recording.
pub use sqlshift_backends as backends;

/// Operations, analysis, rendering, history, and execution.
pub use sqlshift_migrations as migrations;

/// The types most callers need to build and apply a migration.
pub mod prelude {
    pub use sqlshift_backends::{connect, DatabaseBackend, DatabaseConfig};
    pub use sqlshift_core::{Settings, ShiftError, Value};
    pub use sqlshift_migrations::{
        classify, BackendHistoryStore, CancellationToken, HistoryStore, Migration,
        MigrationBuilder, MigrationError, MigrationExecutor, MigrationId, MySqlRenderer,
        PostgresRenderer, SqlRenderer, SqliteRenderer,
    };
}

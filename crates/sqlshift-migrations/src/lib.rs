//! # sqlshift-migrations
//!
//! Schema and data migrations that run against any supported database.
//!
//! ## Architecture
//!
//! - [`MigrationOperation`](operations::MigrationOperation) is the closed set of
//!   schema and data changes. Each variant validates its inputs on construction.
//! - [`Migration`] is an identified, ordered [`OperationSequence`] built with
//!   [`MigrationBuilder`]. Order is exactly the order operations were pushed.
//! - [`classify`] reports which operations may lose schema structure.
//! - [`SqlRenderer`] turns operations into dialect-specific SQL statements.
//! - [`MigrationExecutor`] runs one migration inside a single transaction and
//!   records it in a [`HistoryStore`] only after the commit succeeds.
//!
//! ## Module Overview
//!
//! - [`operations`] - operation variants, column models, validation
//! - [`migration`] - `MigrationId`, `Migration`, `OperationSequence`
//! - [`analyzer`] - destructive-change classification
//! - [`render`] - `SqlRenderer` and the PostgreSQL/SQLite/MySQL renderers
//! - [`history`] - `HistoryStore`, `InMemoryHistory`, `BackendHistoryStore`
//! - [`executor`] - `MigrationExecutor`, `CancellationToken`, run reports
//! - [`error`] - every error type above
//!
//! ## Example
//!
//! ```
//! use sqlshift_migrations::operations::{AddColumn, ColumnModel, ColumnType, RenameColumn};
//! use sqlshift_migrations::{classify, MigrationBuilder, MigrationId};
//!
//! let migration = MigrationBuilder::new(MigrationId::new("0002_user_email").unwrap())
//!     .push(AddColumn::new("users", ColumnModel::new("email", ColumnType::Text)).unwrap())
//!     .push(RenameColumn::new("users", "name", "full_name").unwrap())
//!     .build();
//!
//! assert_eq!(migration.operations().len(), 2);
//! assert!(!classify(migration.operations()).is_destructive);
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::result_large_err)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::match_same_arms)]

pub mod analyzer;
pub mod error;
pub mod executor;
pub mod history;
pub mod migration;
pub mod operations;
pub mod render;

// Re-export key types at the crate root.
pub use analyzer::{classify, Classification, OperationClass};
pub use error::{
    InfrastructureError, MigrationError, MigrationIdError, NotInvertible, RenderError,
    RenderErrorKind, ValidationError, Violation, ViolationKind,
};
pub use executor::{
    CancellationToken, ExecutorOptions, MigrationExecutor, MigrationReport, PendingError,
    PendingReport, RunState,
};
pub use history::{AppliedMigration, BackendHistoryStore, HistoryStore, InMemoryHistory};
pub use migration::{
    Migration, MigrationBuilder, MigrationId, OperationSequence, OrderingHazard, SchemaReference,
};
pub use operations::{Destructiveness, MigrationOperation, Operation, OperationKind};
pub use render::{
    render_sequence, renderer, renderer_for, MySqlRenderer, PostgresRenderer, RenderedStatement,
    SqlRenderer, SqliteRenderer,
};

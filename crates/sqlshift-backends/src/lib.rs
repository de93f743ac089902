//! # sqlshift-backends
//!
//! Database execution channels for sqlshift. A backend runs SQL text and
//! brackets it with explicit transaction calls; it knows nothing about
//! migrations.
//!
//! Supported backends (each behind its cargo feature):
//! - `PostgreSQL` (`postgres`)
//! - `MySQL` (`mysql`)
//! - `SQLite` (`sqlite`)
//!
//! [`RecordingBackend`] is always available for tests and dry runs.

pub mod base;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgresql;
pub mod recording;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use base::{connect, DatabaseBackend, DatabaseBackendType, DatabaseConfig, Row};
#[cfg(feature = "mysql")]
pub use mysql::MySqlBackend;
#[cfg(feature = "postgres")]
pub use postgresql::PostgresBackend;
pub use recording::{RecordedEvent, RecordingBackend};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

//! Base database backend trait and common types.
//!
//! This module defines the [`DatabaseBackend`] trait: the execution channel a
//! migration run sends its statements through. Backends expose explicit
//! `begin_transaction`/`commit`/`rollback` calls; while a transaction is open,
//! every `execute` and `query` goes to the connection that owns it.

use sqlshift_core::{DatabaseSettings, ExecutionError, ShiftError, Value};

/// The database engines sqlshift knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackendType {
    /// PostgreSQL.
    PostgreSQL,
    /// MySQL / MariaDB.
    MySQL,
    /// SQLite.
    SQLite,
}

impl DatabaseBackendType {
    /// Parses an engine name from settings.
    ///
    /// Accepts the short names (`sqlite`, `postgresql`, `mysql`) plus the
    /// common aliases `sqlite3`, `postgres`, `pg`, and `mariadb`.
    pub fn from_engine(engine: &str) -> Option<Self> {
        match engine.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::SQLite),
            "postgresql" | "postgres" | "pg" => Some(Self::PostgreSQL),
            "mysql" | "mariadb" => Some(Self::MySQL),
            _ => None,
        }
    }

    /// Returns the canonical vendor name.
    pub const fn vendor(self) -> &'static str {
        match self {
            Self::PostgreSQL => "postgresql",
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        }
    }
}

/// A single result row returned by [`DatabaseBackend::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from parallel column-name and value lists.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Returns the value of the named column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Returns the value at the given position.
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the named column as a string slice, if it holds a string.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        match self.get(column) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// The execution channel used to apply migrations.
///
/// All methods are async because database operations are I/O-bound. Backends
/// built on synchronous drivers (like `rusqlite`) run their work on
/// `spawn_blocking`.
///
/// Implementations do not lock the target against other writers; callers that
/// may run concurrently against the same database must serialize themselves.
#[async_trait::async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Returns the vendor name (e.g., "postgresql", "sqlite", "mysql").
    fn vendor(&self) -> &str;

    /// Executes a SQL statement that does not return rows.
    ///
    /// Returns the number of rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ExecutionError>;

    /// Executes a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ExecutionError>;

    /// Begins a new database transaction.
    async fn begin_transaction(&self) -> Result<(), ExecutionError>;

    /// Commits the current transaction.
    async fn commit(&self) -> Result<(), ExecutionError>;

    /// Rolls back the current transaction.
    async fn rollback(&self) -> Result<(), ExecutionError>;
}

/// Configuration for connecting to a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// The backend type.
    pub backend: DatabaseBackendType,
    /// The database name or file path.
    pub name: String,
    /// The database host (for network-based backends).
    pub host: Option<String>,
    /// The database port.
    pub port: Option<u16>,
    /// The database user.
    pub user: Option<String>,
    /// The database password.
    pub password: Option<String>,
}

impl DatabaseConfig {
    /// Creates a configuration for an in-memory SQLite database.
    pub fn sqlite_memory() -> Self {
        Self::sqlite_file(":memory:")
    }

    /// Creates a configuration for a SQLite file database.
    pub fn sqlite_file(path: impl Into<String>) -> Self {
        Self {
            backend: DatabaseBackendType::SQLite,
            name: path.into(),
            host: None,
            port: None,
            user: None,
            password: None,
        }
    }

    /// Creates a configuration for a PostgreSQL database.
    pub fn postgres(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            backend: DatabaseBackendType::PostgreSQL,
            name: name.into(),
            host: Some(host.into()),
            port: Some(port),
            user: Some(user.into()),
            password: Some(password.into()),
        }
    }

    /// Creates a configuration for a MySQL database.
    pub fn mysql(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            backend: DatabaseBackendType::MySQL,
            name: name.into(),
            host: Some(host.into()),
            port: Some(port),
            user: Some(user.into()),
            password: Some(password.into()),
        }
    }

    /// Builds a configuration from [`DatabaseSettings`].
    ///
    /// Empty strings and a zero port are treated as "not set".
    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self, ShiftError> {
        let backend = DatabaseBackendType::from_engine(&settings.engine).ok_or_else(|| {
            ShiftError::Configuration(format!("Unknown database engine '{}'", settings.engine))
        })?;
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Ok(Self {
            backend,
            name: settings.name.clone(),
            host: non_empty(&settings.host),
            port: (settings.port != 0).then_some(settings.port),
            user: non_empty(&settings.user),
            password: non_empty(&settings.password),
        })
    }
}

/// Opens a backend for the given configuration.
///
/// Only engines whose cargo feature is enabled can be opened; others fail with
/// [`ShiftError::Configuration`].
#[allow(clippy::unused_async)]
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn DatabaseBackend>, ShiftError> {
    match config.backend {
        #[cfg(feature = "sqlite")]
        DatabaseBackendType::SQLite => Ok(Box::new(crate::sqlite::SqliteBackend::open(
            config.name.as_str(),
        )?)),
        #[cfg(feature = "postgres")]
        DatabaseBackendType::PostgreSQL => Ok(Box::new(
            crate::postgresql::PostgresBackend::from_config(config)?,
        )),
        #[cfg(feature = "mysql")]
        DatabaseBackendType::MySQL => Ok(Box::new(crate::mysql::MySqlBackend::from_config(
            config,
        )?)),
        #[allow(unreachable_patterns)]
        other => Err(ShiftError::Configuration(format!(
            "Backend '{}' is not enabled in this build",
            other.vendor()
        ))),
    }
}

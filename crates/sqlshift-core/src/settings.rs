//! Settings for sqlshift.
//!
//! [`Settings`] holds the database target, logging configuration, and the
//! knobs that govern how migrations are applied. Values are usually loaded
//! through [`settings_loader`](crate::settings_loader); every field has a
//! sensible default.

use serde::{Deserialize, Serialize};

/// The default name of the table that records applied migrations.
pub const DEFAULT_HISTORY_TABLE: &str = "__sqlshift_history";

/// Database connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The database engine: `sqlite`, `postgresql`, or `mysql`.
    pub engine: String,
    /// The database name (or file path for `SQLite`).
    pub name: String,
    /// The database host.
    pub host: String,
    /// The database port. Zero means the engine's default.
    pub port: u16,
    /// The database user.
    pub user: String,
    /// The database password.
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: "sqlite".to_string(),
            name: "db.sqlite3".to_string(),
            host: String::new(),
            port: 0,
            user: String::new(),
            password: String::new(),
        }
    }
}

/// Settings that govern migration runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSettings {
    /// Table that records which migrations have been applied.
    pub history_table: String,
    /// Whether destructive sequences may run without per-call confirmation.
    pub allow_destructive: bool,
    /// Overrides the SQL dialect; defaults to the database engine.
    pub dialect: Option<String>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            history_table: DEFAULT_HISTORY_TABLE.to_string(),
            allow_destructive: false,
            dialect: None,
        }
    }
}

/// The complete set of sqlshift settings.
///
/// # Examples
///
/// ```
/// use sqlshift_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(!settings.debug);
/// assert_eq!(settings.migrations.history_table, "__sqlshift_history");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The log filter (e.g. "info", "sqlshift_migrations=debug").
    pub log_level: String,
    /// The target database.
    pub database: DatabaseSettings,
    /// Migration run settings.
    pub migrations: MigrationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            database: DatabaseSettings::default(),
            migrations: MigrationSettings::default(),
        }
    }
}

impl Settings {
    /// Returns the SQL dialect to render for: the explicit override if set,
    /// otherwise the database engine.
    pub fn dialect(&self) -> &str {
        self.migrations
            .dialect
            .as_deref()
            .unwrap_or(&self.database.engine)
    }
}

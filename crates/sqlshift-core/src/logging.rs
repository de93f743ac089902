//! Logging integration for sqlshift.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-migration spans.

use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// The crate whose events describe individual migration statements.
const MIGRATIONS_TARGET: &str = "sqlshift_migrations";

/// Returns the filter directives used for `settings`.
///
/// `settings.log_level` is used as given when it parses, and `info` otherwise.
/// In debug mode the migrations crate is raised to `debug` so every executed
/// statement is logged, unless the filter already names that crate.
pub fn log_directives(settings: &Settings) -> String {
    let base = if EnvFilter::try_new(&settings.log_level).is_ok() {
        settings.log_level.trim().to_string()
    } else {
        "info".to_string()
    };
    if settings.debug && !base.contains(MIGRATIONS_TARGET) {
        if base.is_empty() {
            format!("{MIGRATIONS_TARGET}=debug")
        } else {
            format!("{base},{MIGRATIONS_TARGET}=debug")
        }
    } else {
        base
    }
}

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter comes from [`log_directives`]. In debug mode a pretty,
/// human-readable format is used; otherwise a structured JSON format is used.
/// Installing a subscriber twice is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(log_directives(settings))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one migration run.
///
/// Every event emitted while the span is entered carries the migration id,
/// the SQL dialect it renders for and the number of operations it holds.
///
/// # Examples
///
/// ```
/// use sqlshift_core::logging::migration_span;
///
/// let span = migration_span("20240101_create_users", "postgresql", 3);
/// let _guard = span.enter();
/// tracing::info!("applying");
/// ```
pub fn migration_span(migration_id: &str, dialect: &str, operations: usize) -> tracing::Span {
    tracing::info_span!("migration", id = migration_id, dialect, operations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(log_level: &str, debug: bool) -> Settings {
        Settings {
            debug,
            log_level: log_level.to_string(),
            ..Settings::default()
        }
    }

    // ── Filter ──────────────────────────────────────────────────────

    #[test]
    fn test_directives_pass_through_outside_debug() {
        assert_eq!(log_directives(&settings("warn", false)), "warn");
    }

    #[test]
    fn test_debug_raises_migration_statements() {
        assert_eq!(
            log_directives(&settings("warn", true)),
            "warn,sqlshift_migrations=debug"
        );
    }

    #[test]
    fn test_debug_keeps_explicit_migrations_directive() {
        let directives = log_directives(&settings("info,sqlshift_migrations=trace", true));
        assert_eq!(directives, "info,sqlshift_migrations=trace");
    }

    #[test]
    fn test_unparseable_filter_falls_back_to_info() {
        assert_eq!(log_directives(&settings("sqlshift=loud", false)), "info");
    }

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let settings = Settings::default();
        setup_logging(&settings);
        setup_logging(&settings);
    }

    // ── Spans ───────────────────────────────────────────────────────

    #[test]
    fn test_migration_span_carries_run_fields() {
        let span = migration_span("0001", "sqlite", 2);
        let metadata = span.metadata().unwrap();
        assert_eq!(metadata.name(), "migration");
        for field in ["id", "dialect", "operations"] {
            assert!(metadata.fields().field(field).is_some(), "missing {field}");
        }
        let _guard = span.enter();
        tracing::debug!("inside span");
    }
}

//! Tracking which migrations have been applied.
//!
//! The executor reads the history once before a run ([`HistoryStore::is_applied`])
//! and writes it once after the commit ([`HistoryStore::record_applied`]).
//! Neither call is made inside the migration's transaction, so there is a
//! window between commit and record in which the database holds changes the
//! history does not know about; the executor reports that as
//! [`MigrationError::CommittedButUnrecorded`](crate::error::MigrationError).
//!
//! Concurrent runs against the same history must be serialized by the caller.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlshift_backends::{DatabaseBackend, DatabaseBackendType};
use sqlshift_core::{MigrationSettings, ShiftError, Value};
use tokio::sync::OnceCell;

use crate::error::InfrastructureError;
use crate::migration::MigrationId;
use crate::render::syntax::Syntax;

/// One applied migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    /// The migration id.
    pub id: MigrationId,
    /// When it was recorded as applied.
    pub applied_at: DateTime<Utc>,
}

/// Persistent record of which migrations have run against a database.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Returns whether `id` has been recorded as applied.
    async fn is_applied(&self, id: &MigrationId) -> Result<bool, InfrastructureError>;

    /// Records `id` as applied at `applied_at`.
    async fn record_applied(
        &self,
        id: &MigrationId,
        applied_at: DateTime<Utc>,
    ) -> Result<(), InfrastructureError>;

    /// Returns every applied migration, oldest first.
    async fn applied(&self) -> Result<Vec<AppliedMigration>, InfrastructureError>;
}

// ── In-memory ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Memory {
    applied: BTreeMap<MigrationId, DateTime<Utc>>,
    fail_reads: bool,
    fail_writes: bool,
}

/// A history kept in memory, for tests and dry runs.
///
/// It can be told to fail reads or writes so the executor's infrastructure
/// error paths can be exercised.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    inner: Mutex<Memory>,
}

impl InMemoryHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history in which `ids` are already applied.
    pub fn with_applied<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = MigrationId>,
    {
        let now = Utc::now();
        let history = Self::default();
        history.lock().applied = ids.into_iter().map(|id| (id, now)).collect();
        history
    }

    /// Makes every read fail.
    #[must_use]
    pub fn failing_reads(self) -> Self {
        self.lock().fail_reads = true;
        self
    }

    /// Makes every write fail.
    #[must_use]
    pub fn failing_writes(self) -> Self {
        self.lock().fail_writes = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Memory> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Result<MutexGuard<'_, Memory>, InfrastructureError> {
        let guard = self.lock();
        if guard.fail_reads {
            return Err(InfrastructureError::new("history store is unavailable"));
        }
        Ok(guard)
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistory {
    async fn is_applied(&self, id: &MigrationId) -> Result<bool, InfrastructureError> {
        Ok(self.read()?.applied.contains_key(id))
    }

    async fn record_applied(
        &self,
        id: &MigrationId,
        applied_at: DateTime<Utc>,
    ) -> Result<(), InfrastructureError> {
        let mut guard = self.lock();
        if guard.fail_writes {
            return Err(InfrastructureError::new("history store rejected the write"));
        }
        guard.applied.insert(id.clone(), applied_at);
        Ok(())
    }

    async fn applied(&self) -> Result<Vec<AppliedMigration>, InfrastructureError> {
        let mut applied: Vec<AppliedMigration> = self
            .read()?
            .applied
            .iter()
            .map(|(id, at)| AppliedMigration {
                id: id.clone(),
                applied_at: *at,
            })
            .collect();
        applied.sort_by(|a, b| a.applied_at.cmp(&b.applied_at).then_with(|| a.id.cmp(&b.id)));
        Ok(applied)
    }
}

// ── Database table ──────────────────────────────────────────────────────

/// A history persisted in a table of the target database.
///
/// The table (default `__sqlshift_history`) has two columns, `migration_id`
/// and `applied_at`, and is created on first use. Timestamps are stored as
/// RFC 3339 text so the layout is identical on every backend. All values are
/// bound as parameters.
pub struct BackendHistoryStore<'a> {
    backend: &'a dyn DatabaseBackend,
    table: String,
    ensured: OnceCell<()>,
}

impl<'a> BackendHistoryStore<'a> {
    /// Creates a store using the default table name.
    pub fn new(backend: &'a dyn DatabaseBackend) -> Self {
        Self {
            backend,
            table: sqlshift_core::settings::DEFAULT_HISTORY_TABLE.to_string(),
            ensured: OnceCell::new(),
        }
    }

    /// Creates a store using the history table named in settings.
    pub fn from_settings(
        backend: &'a dyn DatabaseBackend,
        settings: &MigrationSettings,
    ) -> Result<Self, ShiftError> {
        Self::new(backend).with_table(&settings.history_table)
    }

    /// Uses a different table. The name may be schema-qualified.
    pub fn with_table(self, table: impl Into<String>) -> Result<Self, ShiftError> {
        let table = table.into();
        if table.trim().is_empty() || table.split('.').any(|part| part.trim().is_empty()) {
            return Err(ShiftError::Configuration(format!(
                "invalid history table name: {table:?}"
            )));
        }
        Ok(Self { table, ..self })
    }

    /// Returns the history table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn dialect(&self) -> DatabaseBackendType {
        DatabaseBackendType::from_engine(self.backend.vendor())
            .unwrap_or(DatabaseBackendType::SQLite)
    }

    fn quoted_table(&self) -> String {
        Syntax::new(self.dialect()).table(&self.table)
    }

    fn placeholder(&self, n: usize) -> String {
        match self.dialect() {
            DatabaseBackendType::PostgreSQL => format!("${n}"),
            DatabaseBackendType::SQLite | DatabaseBackendType::MySQL => "?".to_string(),
        }
    }

    async fn ensure_table(&self) -> Result<(), InfrastructureError> {
        self.ensured
            .get_or_try_init(|| async {
                let sql = format!(
                    "CREATE TABLE IF NOT EXISTS {} (\
                     migration_id VARCHAR(255) NOT NULL PRIMARY KEY, \
                     applied_at VARCHAR(64) NOT NULL)",
                    self.quoted_table()
                );
                self.backend.execute(&sql, &[]).await?;
                tracing::debug!(table = %self.table, "history table ready");
                Ok::<(), InfrastructureError>(())
            })
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for BackendHistoryStore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHistoryStore")
            .field("vendor", &self.backend.vendor())
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl HistoryStore for BackendHistoryStore<'_> {
    async fn is_applied(&self, id: &MigrationId) -> Result<bool, InfrastructureError> {
        self.ensure_table().await?;
        let sql = format!(
            "SELECT migration_id FROM {} WHERE migration_id = {}",
            self.quoted_table(),
            self.placeholder(1)
        );
        let rows = self
            .backend
            .query(&sql, &[Value::String(id.as_str().to_string())])
            .await?;
        Ok(!rows.is_empty())
    }

    async fn record_applied(
        &self,
        id: &MigrationId,
        applied_at: DateTime<Utc>,
    ) -> Result<(), InfrastructureError> {
        self.ensure_table().await?;
        let sql = format!(
            "INSERT INTO {} (migration_id, applied_at) VALUES ({}, {})",
            self.quoted_table(),
            self.placeholder(1),
            self.placeholder(2)
        );
        let params = [
            Value::String(id.as_str().to_string()),
            Value::String(applied_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        ];
        self.backend.execute(&sql, &params).await?;
        Ok(())
    }

    async fn applied(&self) -> Result<Vec<AppliedMigration>, InfrastructureError> {
        self.ensure_table().await?;
        let sql = format!(
            "SELECT migration_id, applied_at FROM {} ORDER BY applied_at, migration_id",
            self.quoted_table()
        );
        let rows = self.backend.query(&sql, &[]).await?;
        rows.iter()
            .map(|row| {
                let id = row
                    .get_str("migration_id")
                    .ok_or_else(|| InfrastructureError::new("history row has no migration_id"))?;
                let applied_at = row
                    .get_str("applied_at")
                    .ok_or_else(|| InfrastructureError::new("history row has no applied_at"))?;
                let id = MigrationId::new(id).map_err(|e| {
                    InfrastructureError::new(format!("invalid migration id in history: {e}"))
                })?;
                let applied_at = DateTime::parse_from_rfc3339(applied_at)
                    .map_err(|e| {
                        InfrastructureError::new(format!("invalid applied_at in history: {e}"))
                    })?
                    .with_timezone(&Utc);
                Ok(AppliedMigration { id, applied_at })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlshift_backends::{RecordedEvent, RecordingBackend};

    fn id(s: &str) -> MigrationId {
        MigrationId::new(s).unwrap()
    }

    // ── InMemoryHistory ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_in_memory_record_and_query() {
        let history = InMemoryHistory::new();
        assert!(!history.is_applied(&id("0001")).await.unwrap());
        history.record_applied(&id("0001"), Utc::now()).await.unwrap();
        assert!(history.is_applied(&id("0001")).await.unwrap());
        let applied = history.applied().await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].id, id("0001"));
    }

    #[tokio::test]
    async fn test_in_memory_with_applied() {
        let history = InMemoryHistory::with_applied([id("a"), id("b")]);
        assert!(history.is_applied(&id("b")).await.unwrap());
        let ids: Vec<_> = history
            .applied()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![id("a"), id("b")]);
    }

    #[tokio::test]
    async fn test_in_memory_failures() {
        let history = InMemoryHistory::new().failing_reads();
        assert!(history.is_applied(&id("0001")).await.is_err());
        assert!(history.applied().await.is_err());

        let history = InMemoryHistory::new().failing_writes();
        assert!(history.record_applied(&id("0001"), Utc::now()).await.is_err());
        assert!(!history.is_applied(&id("0001")).await.unwrap());
    }

    // ── BackendHistoryStore ─────────────────────────────────────────

    #[test]
    fn test_backend_store_table_name_validation() {
        let backend = RecordingBackend::new();
        let store = BackendHistoryStore::new(&backend);
        assert_eq!(store.table(), "__sqlshift_history");
        assert!(BackendHistoryStore::new(&backend).with_table("").is_err());
        assert!(BackendHistoryStore::new(&backend).with_table("app.").is_err());
        let store = BackendHistoryStore::new(&backend)
            .with_table("ops.history")
            .unwrap();
        assert_eq!(store.quoted_table(), "\"ops\".\"history\"");
    }

    #[tokio::test]
    async fn test_backend_store_creates_table_once() {
        let backend = RecordingBackend::new();
        let store = BackendHistoryStore::new(&backend);
        store.is_applied(&id("0001")).await.unwrap();
        store.record_applied(&id("0001"), Utc::now()).await.unwrap();

        let sql = backend.executed_sql();
        assert_eq!(sql.len(), 2);
        assert!(sql[0].starts_with("CREATE TABLE IF NOT EXISTS \"__sqlshift_history\""));
        assert!(sql[1].starts_with("INSERT INTO \"__sqlshift_history\""));
    }

    #[tokio::test]
    async fn test_backend_store_binds_parameters() {
        let backend = RecordingBackend::new();
        let store = BackendHistoryStore::new(&backend);
        store
            .record_applied(&id("0001_o'neil"), Utc::now())
            .await
            .unwrap();
        let insert = backend
            .events()
            .into_iter()
            .filter_map(|e| match e {
                RecordedEvent::Execute { sql, params } if sql.starts_with("INSERT") => {
                    Some((sql, params))
                }
                _ => None,
            })
            .next()
            .unwrap();
        assert!(!insert.0.contains("o'neil"));
        assert_eq!(insert.1[0], Value::String("0001_o'neil".into()));
    }

    #[tokio::test]
    async fn test_backend_store_reports_failures() {
        let backend = RecordingBackend::new().failing_on("CREATE TABLE");
        let store = BackendHistoryStore::new(&backend);
        let err = store.is_applied(&id("0001")).await.unwrap_err();
        assert!(err.message.contains("CREATE TABLE"));
    }
}

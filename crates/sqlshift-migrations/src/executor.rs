//! Migration execution engine.
//!
//! The [`MigrationExecutor`] applies one [`Migration`] at a time. A run moves
//! through these states:
//!
//! ```text
//! Pending ──► Rendering ──► Executing ──► Committed
//!    │            │             │
//!    └────────────┴──► Failed   └──► RolledBack
//! ```
//!
//! 1. The history store is asked whether the migration already ran. An
//!    applied migration is rejected before any SQL is produced.
//! 2. The sequence is classified. Destructive sequences are refused unless
//!    the run is confirmed; ordering hazards are logged.
//! 3. Every operation is rendered. A render failure ends the run before a
//!    transaction is opened.
//! 4. A transaction is opened and the statements run in order. The
//!    cancellation token is checked before each statement. Any failure rolls
//!    the whole transaction back.
//! 5. The transaction commits, and only then is the migration recorded as
//!    applied. If recording fails the database is already changed; the run
//!    reports [`MigrationError::CommittedButUnrecorded`] and nothing is
//!    retried.
//!
//! The executor does not lock the target database or the history store.
//! Callers running migrations from several processes must serialize them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlshift_backends::DatabaseBackend;
use sqlshift_core::logging::migration_span;
use sqlshift_core::{ExecutionError, MigrationSettings, Settings, ShiftError};
use thiserror::Error;
use tracing::{debug, error, info, warn, Instrument};

use crate::analyzer::classify;
use crate::error::{MigrationError, RenderError};
use crate::history::HistoryStore;
use crate::migration::{Migration, MigrationId};
use crate::operations::Destructiveness;
use crate::render::{render_sequence, renderer_for, RenderedStatement, SqlRenderer};

/// A flag that asks a running migration to stop.
///
/// Cancellation is honored between statements only. A statement already sent
/// to the database runs to completion; the run then rolls back before the
/// next one.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests cancellation. Every clone of the token observes it.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Options that apply to every run of an executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Apply destructive sequences without a per-call confirmation.
    pub allow_destructive: bool,
}

impl ExecutorOptions {
    /// Reads the options from migration settings.
    pub const fn from_settings(settings: &MigrationSettings) -> Self {
        Self {
            allow_destructive: settings.allow_destructive,
        }
    }
}

/// Where the most recent run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run has started yet.
    Pending,
    /// Operations are being rendered.
    Rendering,
    /// Statements are being sent inside the transaction.
    Executing,
    /// The transaction committed.
    Committed,
    /// The transaction was rolled back.
    RolledBack,
    /// The run was rejected or failed outside an open transaction, or the
    /// commit failed.
    Failed,
}

/// The outcome of a committed and recorded migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// The applied migration.
    pub migration_id: MigrationId,
    /// How many statements were executed.
    pub statements_executed: usize,
    /// The time recorded in the history store.
    pub applied_at: DateTime<Utc>,
}

/// The outcome of [`MigrationExecutor::apply_pending`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingReport {
    /// Migrations applied by this call, in order.
    pub applied: Vec<MigrationReport>,
    /// Migrations that were already applied and left alone.
    pub skipped: Vec<MigrationId>,
}

/// [`MigrationExecutor::apply_pending`] stopped at a failing migration.
#[derive(Debug, Error)]
#[error("migration {migration_id} failed: {error}")]
pub struct PendingError {
    /// The migration that failed.
    pub migration_id: MigrationId,
    /// What was applied or skipped before the failure.
    pub completed: PendingReport,
    /// Why it failed.
    #[source]
    pub error: MigrationError,
}

/// Applies migrations through a [`SqlRenderer`] and a [`DatabaseBackend`].
///
/// One executor runs one migration at a time; `&mut self` enforces that for
/// a single executor value.
pub struct MigrationExecutor {
    renderer: Box<dyn SqlRenderer>,
    options: ExecutorOptions,
    state: RunState,
}

impl MigrationExecutor {
    /// Creates an executor with default options.
    pub fn new(renderer: Box<dyn SqlRenderer>) -> Self {
        Self {
            renderer,
            options: ExecutorOptions::default(),
            state: RunState::Pending,
        }
    }

    /// Replaces the executor's options.
    #[must_use]
    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Creates an executor for the dialect and options in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ShiftError> {
        let renderer = renderer_for(settings.dialect())?;
        Ok(Self::new(renderer).with_options(ExecutorOptions::from_settings(&settings.migrations)))
    }

    /// Returns the options.
    pub const fn options(&self) -> ExecutorOptions {
        self.options
    }

    /// Returns where the most recent run stopped.
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Renders `migration` without executing it.
    pub fn script(&self, migration: &Migration) -> Result<Vec<RenderedStatement>, RenderError> {
        render_sequence(self.renderer.as_ref(), migration.operations())
    }

    /// Applies one migration.
    ///
    /// Destructive sequences are refused unless the executor's options allow
    /// them; see [`apply_confirmed`](Self::apply_confirmed).
    pub async fn apply_migration(
        &mut self,
        migration: &Migration,
        backend: &dyn DatabaseBackend,
        history: &dyn HistoryStore,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport, MigrationError> {
        let allow_destructive = self.options.allow_destructive;
        self.run(migration, backend, history, cancel, allow_destructive)
            .await
    }

    /// Applies one migration, accepting destructive operations for this call.
    pub async fn apply_confirmed(
        &mut self,
        migration: &Migration,
        backend: &dyn DatabaseBackend,
        history: &dyn HistoryStore,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport, MigrationError> {
        self.run(migration, backend, history, cancel, true).await
    }

    /// Applies every migration in `migrations` that has not been applied yet,
    /// in order.
    ///
    /// Stops at the first failure. Migrations after the failing one are not
    /// attempted.
    pub async fn apply_pending(
        &mut self,
        migrations: &[Migration],
        backend: &dyn DatabaseBackend,
        history: &dyn HistoryStore,
        cancel: &CancellationToken,
    ) -> Result<PendingReport, PendingError> {
        let mut report = PendingReport::default();
        for migration in migrations {
            match self
                .apply_migration(migration, backend, history, cancel)
                .await
            {
                Ok(applied) => report.applied.push(applied),
                Err(MigrationError::AlreadyApplied { migration_id }) => {
                    report.skipped.push(migration_id);
                }
                Err(error) => {
                    return Err(PendingError {
                        migration_id: migration.id().clone(),
                        completed: report,
                        error,
                    });
                }
            }
        }
        info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "pending migrations done"
        );
        Ok(report)
    }

    async fn run(
        &mut self,
        migration: &Migration,
        backend: &dyn DatabaseBackend,
        history: &dyn HistoryStore,
        cancel: &CancellationToken,
        allow_destructive: bool,
    ) -> Result<MigrationReport, MigrationError> {
        let span = migration_span(
            migration.id().as_str(),
            self.renderer.backend_type().vendor(),
            migration.operations().len(),
        );
        async {
            self.state = RunState::Pending;
            let result = self
                .run_inner(migration, backend, history, cancel, allow_destructive)
                .await;
            if let Err(err) = &result {
                debug!(state = ?self.state, "run ended: {err}");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_inner(
        &mut self,
        migration: &Migration,
        backend: &dyn DatabaseBackend,
        history: &dyn HistoryStore,
        cancel: &CancellationToken,
        allow_destructive: bool,
    ) -> Result<MigrationReport, MigrationError> {
        let id = migration.id();
        let operations = migration.operations();

        match history.is_applied(id).await {
            Ok(false) => {}
            Ok(true) => {
                info!("already applied, skipping");
                self.state = RunState::Failed;
                return Err(MigrationError::AlreadyApplied {
                    migration_id: id.clone(),
                });
            }
            Err(source) => {
                self.state = RunState::Failed;
                return Err(MigrationError::HistoryCheck { source });
            }
        }

        let classification = classify(operations);
        for class in &classification.per_operation {
            if class.destructiveness == Destructiveness::Destructive {
                warn!(
                    operation_index = class.index,
                    kind = %class.kind,
                    "destructive operation"
                );
            }
        }
        if classification.is_destructive && !allow_destructive {
            self.state = RunState::Failed;
            return Err(MigrationError::DestructiveChangeNotConfirmed {
                operation_indices: classification.destructive_indices(),
            });
        }
        for hazard in operations.ordering_hazards() {
            warn!(
                operation_index = hazard.operation_index,
                created_at = hazard.created_at,
                "ordering hazard: {hazard}"
            );
        }

        self.state = RunState::Rendering;
        if tracing::enabled!(tracing::Level::DEBUG) {
            match serde_json::to_string(operations) {
                Ok(json) => debug!(operations = %json, "operation sequence"),
                Err(err) => debug!(error = %err, "operation sequence not serializable"),
            }
        }
        let statements = match render_sequence(self.renderer.as_ref(), operations) {
            Ok(statements) => statements,
            Err(err) => {
                self.state = RunState::Failed;
                return Err(err.into());
            }
        };
        info!(
            operations = operations.len(),
            statements = statements.len(),
            dialect = self.renderer.backend_type().vendor(),
            "applying migration"
        );

        self.state = RunState::Executing;
        if let Err(source) = backend.begin_transaction().await {
            self.state = RunState::Failed;
            return Err(MigrationError::Transaction { source });
        }

        for (statement_index, statement) in statements.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    next_operation_index = statement.operation_index,
                    "cancellation requested, rolling back"
                );
                let rollback_error = roll_back(backend).await;
                self.state = RunState::RolledBack;
                return Err(MigrationError::Cancelled {
                    next_operation_index: statement.operation_index,
                    rollback_error,
                });
            }

            debug!(
                operation_index = statement.operation_index,
                statement_index,
                sql = %statement.sql,
                "executing statement"
            );
            if let Err(source) = backend.execute(&statement.sql, &[]).await {
                error!(
                    operation_index = statement.operation_index,
                    statement_index,
                    error = %source,
                    "statement failed, rolling back"
                );
                let rollback_error = roll_back(backend).await;
                self.state = RunState::RolledBack;
                return Err(MigrationError::Execution {
                    operation_index: statement.operation_index,
                    statement_index,
                    source,
                    rollback_error,
                });
            }
        }

        if let Err(source) = backend.commit().await {
            error!(error = %source, "commit failed");
            if let Err(err) = backend.rollback().await {
                debug!(error = %err, "rollback after failed commit");
            }
            self.state = RunState::Failed;
            return Err(MigrationError::Commit { source });
        }
        self.state = RunState::Committed;
        info!(statements = statements.len(), "committed");

        let applied_at = Utc::now();
        if let Err(source) = history.record_applied(id, applied_at).await {
            error!(
                error = %source,
                "migration committed but not recorded; reconcile the history store by hand"
            );
            return Err(MigrationError::CommittedButUnrecorded {
                migration_id: id.clone(),
                source,
            });
        }
        info!(%applied_at, "recorded as applied");

        Ok(MigrationReport {
            migration_id: id.clone(),
            statements_executed: statements.len(),
            applied_at,
        })
    }
}

impl std::fmt::Debug for MigrationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationExecutor")
            .field("dialect", &self.renderer.backend_type())
            .field("options", &self.options)
            .field("state", &self.state)
            .finish()
    }
}

async fn roll_back(backend: &dyn DatabaseBackend) -> Option<ExecutionError> {
    match backend.rollback().await {
        Ok(()) => None,
        Err(err) => {
            error!(error = %err, "rollback failed");
            Some(err)
        }
    }
}

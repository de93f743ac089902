//! Integration tests for the migration pipeline.
//!
//! These tests run real DDL and DML against SQLite in-memory databases and
//! verify that:
//! - Sequences execute in the order they were built
//! - A render failure sends nothing to the database
//! - A failing statement or a cancellation rolls every earlier statement back
//! - The history table tracks applied migrations and blocks re-application
//! - A computed inverse migration undoes a forward one

use std::sync::atomic::{AtomicUsize, Ordering};

use sqlshift_backends::{DatabaseBackend, RecordingBackend, Row, SqliteBackend};
use sqlshift_core::{ExecutionError, Value};
use sqlshift_migrations::operations::{
    AddColumn, ColumnModel, ColumnType, CreateIndex, CreateTable, DeleteRows, DropTable,
    InsertRows, RenameColumn, Sql, UpdateRows,
};
use sqlshift_migrations::{
    classify, BackendHistoryStore, CancellationToken, HistoryStore, InMemoryHistory, Migration,
    MigrationBuilder, MigrationError, MigrationExecutor, MigrationId, OperationKind,
    RenderErrorKind, RunState, SqliteRenderer, ViolationKind,
};

fn id(s: &str) -> MigrationId {
    MigrationId::new(s).unwrap()
}

fn sqlite_executor() -> MigrationExecutor {
    MigrationExecutor::new(Box::new(SqliteRenderer))
}

fn create_users() -> CreateTable {
    CreateTable::new(
        "users",
        vec![
            ColumnModel::new("id", ColumnType::BigInt).identity(),
            ColumnModel::new("name", ColumnType::String { max_length: Some(100) }).not_null(),
        ],
    )
    .unwrap()
    .with_primary_key(["id"])
    .unwrap()
}

fn initial() -> Migration {
    MigrationBuilder::new(id("0001_initial"))
        .push(create_users())
        .push(
            InsertRows::new(
                "users",
                ["id", "name"],
                vec![
                    vec![Value::Int(1), Value::from("Alice")],
                    vec![Value::Int(2), Value::from("Bob")],
                    vec![Value::Int(3), Value::from("Carol")],
                ],
            )
            .unwrap(),
        )
        .build()
}

async fn table_exists(backend: &SqliteBackend, name: &str) -> bool {
    !backend
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            &[Value::from(name)],
        )
        .await
        .unwrap()
        .is_empty()
}

async fn user_names(backend: &SqliteBackend) -> Vec<String> {
    backend
        .query("SELECT name FROM users ORDER BY id", &[])
        .await
        .unwrap()
        .iter()
        .filter_map(|row| row.get_str("name").map(String::from))
        .collect()
}

// ── 1. Forward execution ────────────────────────────────────────────────

#[tokio::test]
async fn test_apply_creates_and_populates_table() {
    let backend = SqliteBackend::memory().unwrap();
    let history = BackendHistoryStore::new(&backend);
    let mut executor = sqlite_executor();

    let report = executor
        .apply_migration(&initial(), &backend, &history, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.statements_executed, 4);
    assert_eq!(executor.state(), RunState::Committed);
    assert!(table_exists(&backend, "users").await);
    assert_eq!(user_names(&backend).await, vec!["Alice", "Bob", "Carol"]);
}

#[tokio::test]
async fn test_operations_run_in_built_order() {
    let backend = SqliteBackend::memory().unwrap();
    let history = InMemoryHistory::new();
    let mut executor = sqlite_executor();
    executor
        .apply_migration(&initial(), &backend, &history, &CancellationToken::new())
        .await
        .unwrap();

    // The update depends on the column added just before it.
    let migration = MigrationBuilder::new(id("0002_email"))
        .push(AddColumn::new("users", ColumnModel::new("email", ColumnType::Text)).unwrap())
        .push(
            UpdateRows::new(
                "users",
                ["id"],
                vec![vec![Value::Int(1)]],
                ["email"],
                vec![vec![Value::from("alice@example.com")]],
            )
            .unwrap(),
        )
        .push(CreateIndex::new("users", "ix_users_email", ["email"]).unwrap().unique())
        .push(RenameColumn::new("users", "name", "full_name").unwrap())
        .build();

    let script = executor.script(&migration).unwrap();
    let indices: Vec<usize> = script.iter().map(|s| s.operation_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);

    executor
        .apply_migration(&migration, &backend, &history, &CancellationToken::new())
        .await
        .unwrap();

    let rows = backend
        .query("SELECT full_name, email FROM users WHERE id = 1", &[])
        .await
        .unwrap();
    assert_eq!(rows[0].get_str("full_name"), Some("Alice"));
    assert_eq!(rows[0].get_str("email"), Some("alice@example.com"));
}

// ── 2. Row deletion ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_rows_one_statement_per_tuple() {
    let backend = SqliteBackend::memory().unwrap();
    let history = InMemoryHistory::new();
    let mut executor = sqlite_executor();
    executor
        .apply_migration(&initial(), &backend, &history, &CancellationToken::new())
        .await
        .unwrap();

    let migration = MigrationBuilder::new(id("0002_cleanup"))
        .push(DeleteRows::new("users", ["id"], vec![vec![Value::Int(1)], vec![Value::Int(2)]]).unwrap())
        .build();

    let script = executor.script(&migration).unwrap();
    assert_eq!(script.len(), 2);
    assert!(script[0].sql.ends_with("\"id\" = 1"));
    assert!(script[1].sql.ends_with("\"id\" = 2"));

    // Row deletion is not a destructive change, so no confirmation is needed.
    assert!(!classify(migration.operations()).is_destructive);
    executor
        .apply_migration(&migration, &backend, &history, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(user_names(&backend).await, vec!["Carol"]);
}

#[test]
fn test_delete_rows_arity_mismatch_is_render_error() {
    let migration = MigrationBuilder::new(id("0002"))
        .push(DeleteRows::new("Users", ["Id"], vec![vec![Value::Int(1), Value::Int(2)]]).unwrap())
        .build();
    let err = sqlite_executor().script(&migration).unwrap_err();
    assert_eq!(err.operation_index, 0);
    assert_eq!(
        err.reason,
        RenderErrorKind::ArityMismatch {
            row: 0,
            expected: 1,
            actual: 2
        }
    );
}

// ── 3. Nothing reaches the database on a render failure ─────────────────

#[tokio::test]
async fn test_render_failure_sends_no_statements() {
    let backend = RecordingBackend::new();
    let migration = MigrationBuilder::new(id("0003"))
        .push(create_users())
        .push(DeleteRows::new("users", ["id"], vec![vec![]]).unwrap())
        .push(Sql::new("SELECT 1").unwrap())
        .build();

    let err = sqlite_executor()
        .apply_migration(&migration, &backend, &InMemoryHistory::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.failed_operation_index(), Some(1));
    assert!(backend.events().is_empty());
}

#[tokio::test]
async fn test_unsupported_operation_fails_before_execution() {
    let backend = SqliteBackend::memory().unwrap();
    let migration = MigrationBuilder::new(id("0004"))
        .push(create_users())
        .push(sqlshift_migrations::operations::RenameIndex::new("users", "a", "b").unwrap())
        .build();

    let err = sqlite_executor()
        .apply_migration(&migration, &backend, &InMemoryHistory::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        MigrationError::Render(render) => {
            assert_eq!(render.operation_index, 1);
            assert_eq!(
                render.reason,
                RenderErrorKind::Unsupported {
                    operation: OperationKind::RenameIndex,
                    dialect: "sqlite"
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!table_exists(&backend, "users").await);
}

// ── 4. Atomicity ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failing_statement_rolls_back_earlier_ddl() {
    let backend = SqliteBackend::memory().unwrap();
    let history = InMemoryHistory::new();
    let migration = MigrationBuilder::new(id("0001"))
        .push(create_users())
        .push(Sql::new("INSERT INTO missing_table (x) VALUES (1)").unwrap())
        .build();

    let mut executor = sqlite_executor();
    let err = executor
        .apply_migration(&migration, &backend, &history, &CancellationToken::new())
        .await
        .unwrap_err();

    match &err {
        MigrationError::Execution {
            operation_index,
            statement_index,
            source,
            rollback_error,
        } => {
            assert_eq!(*operation_index, 1);
            assert_eq!(*statement_index, 1);
            assert!(source.message.contains("missing_table"));
            assert!(rollback_error.is_none());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(executor.state(), RunState::RolledBack);
    assert!(!table_exists(&backend, "users").await);
    assert!(!history.is_applied(&id("0001")).await.unwrap());
}

/// Delegates to SQLite and requests cancellation after a number of statements.
struct CancelAfter {
    inner: SqliteBackend,
    token: CancellationToken,
    after: usize,
    executed: AtomicUsize,
}

#[async_trait::async_trait]
impl DatabaseBackend for CancelAfter {
    fn vendor(&self) -> &str {
        self.inner.vendor()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ExecutionError> {
        let result = self.inner.execute(sql, params).await;
        if self.executed.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
            self.token.cancel();
        }
        result
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ExecutionError> {
        self.inner.query(sql, params).await
    }

    async fn begin_transaction(&self) -> Result<(), ExecutionError> {
        self.inner.begin_transaction().await
    }

    async fn commit(&self) -> Result<(), ExecutionError> {
        self.inner.commit().await
    }

    async fn rollback(&self) -> Result<(), ExecutionError> {
        self.inner.rollback().await
    }
}

#[tokio::test]
async fn test_cancellation_between_statements_rolls_back() {
    let token = CancellationToken::new();
    let backend = CancelAfter {
        inner: SqliteBackend::memory().unwrap(),
        token: token.clone(),
        after: 1,
        executed: AtomicUsize::new(0),
    };
    let migration = MigrationBuilder::new(id("0001"))
        .push(create_users())
        .push(Sql::new("CREATE TABLE audit (id INTEGER)").unwrap())
        .push(Sql::new("CREATE TABLE extra (id INTEGER)").unwrap())
        .build();

    let mut executor = sqlite_executor();
    let err = executor
        .apply_migration(&migration, &backend, &InMemoryHistory::new(), &token)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MigrationError::Cancelled {
            next_operation_index: 1,
            rollback_error: None
        }
    ));
    assert_eq!(executor.state(), RunState::RolledBack);
    assert!(!table_exists(&backend.inner, "users").await);
    assert!(!table_exists(&backend.inner, "audit").await);
}

// ── 5. History ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reapply_is_rejected_before_sql() {
    let backend = SqliteBackend::memory().unwrap();
    let history = BackendHistoryStore::new(&backend);
    let mut executor = sqlite_executor();
    let cancel = CancellationToken::new();

    executor
        .apply_migration(&initial(), &backend, &history, &cancel)
        .await
        .unwrap();
    assert!(history.is_applied(&id("0001_initial")).await.unwrap());

    let err = executor
        .apply_migration(&initial(), &backend, &history, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::AlreadyApplied { .. }));
    // A second CREATE TABLE would have failed; the row count proves nothing ran.
    assert_eq!(user_names(&backend).await.len(), 3);
}

#[tokio::test]
async fn test_history_table_lists_applied_in_order() {
    let backend = SqliteBackend::memory().unwrap();
    let history = BackendHistoryStore::new(&backend)
        .with_table("schema_history")
        .unwrap();
    let mut executor = sqlite_executor();
    let migrations = vec![
        initial(),
        MigrationBuilder::new(id("0002_audit"))
            .push(Sql::new("CREATE TABLE audit (id INTEGER)").unwrap())
            .build(),
    ];

    let report = executor
        .apply_pending(&migrations, &backend, &history, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.applied.len(), 2);

    let applied = history.applied().await.unwrap();
    let ids: Vec<&str> = applied.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["0001_initial", "0002_audit"]);
    assert!(table_exists(&backend, "schema_history").await);

    // Running the same list again skips both.
    let again = executor
        .apply_pending(&migrations, &backend, &history, &CancellationToken::new())
        .await
        .unwrap();
    assert!(again.applied.is_empty());
    assert_eq!(again.skipped, vec![id("0001_initial"), id("0002_audit")]);
}

#[tokio::test]
async fn test_unrecorded_commit_is_reported() {
    let backend = SqliteBackend::memory().unwrap();
    let history = InMemoryHistory::new().failing_writes();
    let mut executor = sqlite_executor();

    let err = executor
        .apply_migration(&initial(), &backend, &history, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.needs_reconciliation());
    assert_eq!(executor.state(), RunState::Committed);
    assert!(table_exists(&backend, "users").await);
}

// ── 6. Destructive changes and inverses ─────────────────────────────────

#[tokio::test]
async fn test_inverse_undoes_forward_migration() {
    let backend = SqliteBackend::memory().unwrap();
    let history = InMemoryHistory::new();
    let mut executor = sqlite_executor();
    let cancel = CancellationToken::new();

    let forward = MigrationBuilder::new(id("0001_orders"))
        .push(
            CreateTable::new("orders", vec![ColumnModel::new("id", ColumnType::Int).not_null()])
                .unwrap(),
        )
        .push(AddColumn::new("orders", ColumnModel::new("total", ColumnType::Double)).unwrap())
        .build();
    executor
        .apply_migration(&forward, &backend, &history, &cancel)
        .await
        .unwrap();
    assert!(table_exists(&backend, "orders").await);

    let backward = Migration::new(id("0001_orders_reverse"), forward.operations().inverse().unwrap());
    let kinds: Vec<OperationKind> = backward
        .operations()
        .iter()
        .map(sqlshift_migrations::Operation::kind)
        .collect();
    assert_eq!(kinds, vec![OperationKind::DropColumn, OperationKind::DropTable]);

    let err = executor
        .apply_migration(&backward, &backend, &history, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MigrationError::DestructiveChangeNotConfirmed { ref operation_indices }
            if operation_indices == &vec![0, 1]
    ));
    assert!(table_exists(&backend, "orders").await);

    executor
        .apply_confirmed(&backward, &backend, &history, &cancel)
        .await
        .unwrap();
    assert!(!table_exists(&backend, "orders").await);
}

#[test]
fn test_drop_table_is_destructive() {
    let migration = MigrationBuilder::new(id("0009"))
        .push(Sql::new("SELECT 1").unwrap())
        .push(DropTable::new("users").unwrap())
        .build();
    let first = classify(migration.operations());
    let second = classify(migration.operations());
    assert_eq!(first, second);
    assert_eq!(first.destructive_indices(), vec![1]);
}

// ── 7. Validation ───────────────────────────────────────────────────────

#[test]
fn test_validation_reports_every_violation() {
    let err = InsertRows::new("  ", Vec::<String>::new(), vec![]).unwrap_err();
    assert_eq!(err.operation, OperationKind::InsertRows);
    assert_eq!(err.violations.len(), 3);
    assert!(err.has_violation("table", ViolationKind::Empty));
    assert!(err.has_violation("columns", ViolationKind::EmptyCollection));
    assert!(err.has_violation("values", ViolationKind::EmptyCollection));
}

#[test]
fn test_update_rows_key_arity_checked_at_construction() {
    let err = UpdateRows::new(
        "users",
        ["id"],
        vec![vec![Value::Int(1)]],
        ["name"],
        vec![vec![Value::from("a")], vec![Value::from("b")]],
    )
    .unwrap_err();
    assert!(err.has_violation(
        "key_values",
        ViolationKind::MismatchedArity {
            expected: 2,
            actual: 1
        }
    ));
}

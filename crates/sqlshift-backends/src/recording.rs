//! An in-process backend that records every call instead of talking to a
//! database.
//!
//! [`RecordingBackend`] is used by tests and dry runs. It tracks which
//! statements were committed and which were discarded by a rollback, and it
//! can be told to fail at a chosen point so failure paths can be exercised
//! without a live database.

use std::sync::{Mutex, MutexGuard};

use sqlshift_core::{ExecutionError, Value};

use crate::base::{DatabaseBackend, Row};

/// One call observed by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    /// `begin_transaction` was called.
    Begin,
    /// A statement was executed (successfully or not).
    Execute {
        /// The SQL text.
        sql: String,
        /// The bound parameters.
        params: Vec<Value>,
    },
    /// `commit` was called.
    Commit,
    /// `rollback` was called.
    Rollback,
}

/// Where a [`RecordingBackend`] should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Failure {
    /// The n-th `execute` call (zero-based, counted across the backend's life).
    NthStatement(usize),
    /// Any statement whose SQL contains the given text.
    Containing(String),
}

#[derive(Debug, Default)]
struct State {
    events: Vec<RecordedEvent>,
    in_transaction: bool,
    pending: Vec<String>,
    committed: Vec<String>,
    executed: usize,
    failure: Option<Failure>,
    fail_begin: bool,
    fail_commit: bool,
    fail_rollback: bool,
}

/// A backend that records calls and simulates transactional behavior.
///
/// Statements executed outside a transaction count as committed immediately.
/// Queries always return no rows.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    state: Mutex<State>,
}

impl RecordingBackend {
    /// Creates a backend that never fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the n-th executed statement (zero-based).
    #[must_use]
    pub fn failing_at(self, n: usize) -> Self {
        self.lock().failure = Some(Failure::NthStatement(n));
        self
    }

    /// Fails any statement whose SQL contains `needle`.
    #[must_use]
    pub fn failing_on(self, needle: impl Into<String>) -> Self {
        self.lock().failure = Some(Failure::Containing(needle.into()));
        self
    }

    /// Makes `begin_transaction` fail.
    #[must_use]
    pub fn failing_begin(self) -> Self {
        self.lock().fail_begin = true;
        self
    }

    /// Makes `commit` fail.
    #[must_use]
    pub fn failing_commit(self) -> Self {
        self.lock().fail_commit = true;
        self
    }

    /// Makes `rollback` fail.
    #[must_use]
    pub fn failing_rollback(self) -> Self {
        self.lock().fail_rollback = true;
        self
    }

    /// Returns every recorded call, in order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().events.clone()
    }

    /// Returns the SQL of every `execute` call, in order, including failed ones.
    pub fn executed_sql(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::Execute { sql, .. } => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the statements that are durably applied.
    pub fn committed(&self) -> Vec<String> {
        self.lock().committed.clone()
    }

    /// Returns `true` while a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.lock().in_transaction
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl DatabaseBackend for RecordingBackend {
    fn vendor(&self) -> &str {
        "recording"
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ExecutionError> {
        let mut state = self.lock();
        state.events.push(RecordedEvent::Execute {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        let index = state.executed;
        state.executed += 1;

        let fails = match &state.failure {
            Some(Failure::NthStatement(n)) => *n == index,
            Some(Failure::Containing(needle)) => sql.contains(needle.as_str()),
            None => false,
        };
        if fails {
            return Err(ExecutionError::new(format!("simulated failure executing: {sql}"))
                .with_sql_state("XX000"));
        }

        if state.in_transaction {
            state.pending.push(sql.to_string());
        } else {
            state.committed.push(sql.to_string());
        }
        Ok(0)
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>, ExecutionError> {
        Ok(Vec::new())
    }

    async fn begin_transaction(&self) -> Result<(), ExecutionError> {
        let mut state = self.lock();
        state.events.push(RecordedEvent::Begin);
        if state.fail_begin {
            return Err(ExecutionError::new("simulated failure beginning transaction"));
        }
        if state.in_transaction {
            return Err(ExecutionError::new("A transaction is already open"));
        }
        state.in_transaction = true;
        Ok(())
    }

    async fn commit(&self) -> Result<(), ExecutionError> {
        let mut state = self.lock();
        state.events.push(RecordedEvent::Commit);
        if !state.in_transaction {
            return Err(ExecutionError::new("No transaction is open"));
        }
        if state.fail_commit {
            // A failed commit leaves nothing applied.
            state.pending.clear();
            state.in_transaction = false;
            return Err(ExecutionError::new("simulated failure committing"));
        }
        let pending = std::mem::take(&mut state.pending);
        state.committed.extend(pending);
        state.in_transaction = false;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), ExecutionError> {
        let mut state = self.lock();
        state.events.push(RecordedEvent::Rollback);
        if state.fail_rollback {
            return Err(ExecutionError::new("simulated failure rolling back"));
        }
        state.pending.clear();
        state.in_transaction = false;
        Ok(())
    }
}

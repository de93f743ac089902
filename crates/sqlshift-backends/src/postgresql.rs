//! PostgreSQL database backend using `tokio-postgres` and `deadpool-postgres`.
//!
//! This module provides the [`PostgresBackend`] which implements the
//! [`DatabaseBackend`](crate::base::DatabaseBackend) trait using connection
//! pooling via `deadpool-postgres`.
//!
//! `begin_transaction` checks a connection out of the pool and pins it until
//! `commit` or `rollback`; every statement issued in between runs on that
//! pinned connection. PostgreSQL runs DDL transactionally, so a rolled-back
//! migration leaves the schema untouched.

use sqlshift_core::{ExecutionError, ShiftError, Value};
use tokio::sync::Mutex;

use crate::base::{DatabaseBackend, DatabaseConfig, Row};

type SqlParam = Box<dyn tokio_postgres::types::ToSql + Sync + Send>;

/// A PostgreSQL database backend.
///
/// Uses `deadpool-postgres` for connection pooling and `tokio-postgres` for
/// query execution.
pub struct PostgresBackend {
    pool: deadpool_postgres::Pool,
    /// The connection that owns the open transaction, if any.
    transaction: Mutex<Option<deadpool_postgres::Object>>,
}

impl PostgresBackend {
    /// Creates a new `PostgresBackend` from a `deadpool-postgres` pool.
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self {
            pool,
            transaction: Mutex::new(None),
        }
    }

    /// Creates a new backend from a [`DatabaseConfig`].
    ///
    /// No connection is opened until the first statement runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, ShiftError> {
        let mut pg_config = deadpool_postgres::Config::new();
        pg_config.dbname = Some(config.name.clone());
        pg_config.host = config.host.clone();
        pg_config.port = config.port;
        pg_config.user = config.user.clone();
        pg_config.password = config.password.clone();

        let pool = pg_config
            .create_pool(
                Some(deadpool_postgres::Runtime::Tokio1),
                tokio_postgres::NoTls,
            )
            .map_err(|e| ShiftError::Operational(format!("Failed to create pool: {e}")))?;

        Ok(Self::new(pool))
    }

    /// Converts `Value`s to `tokio-postgres` parameters.
    fn value_to_sql_params(params: &[Value]) -> Vec<SqlParam> {
        params
            .iter()
            .map(|v| -> SqlParam {
                match v {
                    Value::Null => Box::new(Option::<String>::None),
                    Value::Bool(b) => Box::new(*b),
                    Value::Int(i) => Box::new(*i),
                    Value::Float(f) => Box::new(*f),
                    Value::String(s) => Box::new(s.clone()),
                    Value::Bytes(b) => Box::new(b.clone()),
                    Value::Date(d) => Box::new(*d),
                    Value::DateTime(dt) => Box::new(*dt),
                    Value::DateTimeTz(dt) => Box::new(*dt),
                    Value::Time(t) => Box::new(*t),
                    Value::Uuid(u) => Box::new(*u),
                    Value::Json(j) => Box::new(j.clone()),
                }
            })
            .collect()
    }

    /// Converts a `tokio_postgres::Row` to our generic `Row`.
    fn convert_row(pg_row: &tokio_postgres::Row) -> Row {
        let columns: Vec<String> = pg_row
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let values: Vec<Value> = pg_row
            .columns()
            .iter()
            .enumerate()
            .map(|(i, col)| {
                use tokio_postgres::types::Type;
                match *col.type_() {
                    Type::BOOL => pg_row
                        .try_get::<_, Option<bool>>(i)
                        .ok()
                        .flatten()
                        .map_or(Value::Null, Value::Bool),
                    Type::INT2 => pg_row
                        .try_get::<_, Option<i16>>(i)
                        .ok()
                        .flatten()
                        .map_or(Value::Null, |v| Value::Int(i64::from(v))),
                    Type::INT4 => pg_row
                        .try_get::<_, Option<i32>>(i)
                        .ok()
                        .flatten()
                        .map_or(Value::Null, |v| Value::Int(i64::from(v))),
                    Type::INT8 => pg_row
                        .try_get::<_, Option<i64>>(i)
                        .ok()
                        .flatten()
                        .map_or(Value::Null, Value::Int),
                    Type::FLOAT8 => pg_row
                        .try_get::<_, Option<f64>>(i)
                        .ok()
                        .flatten()
                        .map_or(Value::Null, Value::Float),
                    Type::BYTEA => pg_row
                        .try_get::<_, Option<Vec<u8>>>(i)
                        .ok()
                        .flatten()
                        .map_or(Value::Null, Value::Bytes),
                    Type::UUID => pg_row
                        .try_get::<_, Option<uuid::Uuid>>(i)
                        .ok()
                        .flatten()
                        .map_or(Value::Null, Value::Uuid),
                    Type::TIMESTAMPTZ => pg_row
                        .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(i)
                        .ok()
                        .flatten()
                        .map_or(Value::Null, Value::DateTimeTz),
                    Type::TIMESTAMP => pg_row
                        .try_get::<_, Option<chrono::NaiveDateTime>>(i)
                        .ok()
                        .flatten()
                        .map_or(Value::Null, Value::DateTime),
                    Type::JSON | Type::JSONB => pg_row
                        .try_get::<_, Option<serde_json::Value>>(i)
                        .ok()
                        .flatten()
                        .map_or(Value::Null, Value::Json),
                    _ => pg_row
                        .try_get::<_, Option<String>>(i)
                        .ok()
                        .flatten()
                        .map_or(Value::Null, Value::String),
                }
            })
            .collect();

        Row::new(columns, values)
    }

    async fn checkout(&self) -> Result<deadpool_postgres::Object, ExecutionError> {
        self.pool
            .get()
            .await
            .map_err(|e| ExecutionError::new(format!("Pool error: {e}")))
    }

    /// Removes the pinned transaction connection.
    async fn take_transaction(&self) -> Result<deadpool_postgres::Object, ExecutionError> {
        self.transaction
            .lock()
            .await
            .take()
            .ok_or_else(|| ExecutionError::new("No transaction is open"))
    }
}

/// Maps a driver error, keeping the server's SQLSTATE when there is one.
fn pg_error(e: &tokio_postgres::Error) -> ExecutionError {
    let message = e
        .as_db_error()
        .map_or_else(|| e.to_string(), |db| db.message().to_string());
    match e.code() {
        Some(state) => ExecutionError::new(message).with_sql_state(state.code()),
        None => ExecutionError::new(message),
    }
}

#[async_trait::async_trait]
impl DatabaseBackend for PostgresBackend {
    fn vendor(&self) -> &str {
        "postgresql"
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ExecutionError> {
        let sql_params = Self::value_to_sql_params(params);
        let param_refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = sql_params
            .iter()
            .map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect();

        let pinned = self.transaction.lock().await;
        let result = match pinned.as_ref() {
            Some(client) => client.execute(sql, &param_refs).await,
            None => self.checkout().await?.execute(sql, &param_refs).await,
        };
        result.map_err(|e| pg_error(&e))
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ExecutionError> {
        let sql_params = Self::value_to_sql_params(params);
        let param_refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = sql_params
            .iter()
            .map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect();

        let pinned = self.transaction.lock().await;
        let rows = match pinned.as_ref() {
            Some(client) => client.query(sql, &param_refs).await,
            None => self.checkout().await?.query(sql, &param_refs).await,
        }
        .map_err(|e| pg_error(&e))?;

        Ok(rows.iter().map(Self::convert_row).collect())
    }

    async fn begin_transaction(&self) -> Result<(), ExecutionError> {
        let mut pinned = self.transaction.lock().await;
        if pinned.is_some() {
            return Err(ExecutionError::new("A transaction is already open"));
        }
        let client = self.checkout().await?;
        client.batch_execute("BEGIN").await.map_err(|e| pg_error(&e))?;
        *pinned = Some(client);
        Ok(())
    }

    async fn commit(&self) -> Result<(), ExecutionError> {
        let client = self.take_transaction().await?;
        client.batch_execute("COMMIT").await.map_err(|e| pg_error(&e))
    }

    async fn rollback(&self) -> Result<(), ExecutionError> {
        let client = self.take_transaction().await?;
        client
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| pg_error(&e))
    }
}

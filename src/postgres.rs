/*!
 * PostgreSQL driver built on sqlx
 *
 * Function calls are sent as `SELECT coalesce(json_agg(t), '[]'::json)
 * FROM name(args) AS t` with arguments rendered as SQL literals, so the
 * server resolves argument types exactly as it would for hand-written SQL.
 * `execute` statements inside transactions use bound parameters instead.
 *
 * Transactions are held in an `sqlx::Transaction`, so a call that is
 * cancelled mid-body never returns an open transaction to the pool.
 */

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use pgpw_core_resilience::classifier::{CONNECTION_REFUSED, TIMED_OUT};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{Connection, Executor, Postgres, Row};
use tracing::{debug, warn};

use crate::config::ConnectionDetails;
use crate::driver::{Driver, DriverError, DriverResult, TransactionBody, TransactionContext};
use crate::transaction::TransactionMode;
use crate::validation::validate_function_name;

/// Message used for connections closed by the server mid-session
pub const CONNECTION_TERMINATED_MESSAGE: &str = "Connection terminated unexpectedly";

/// Where the driver sends its traffic; attached to connection failures
#[derive(Debug, Clone, PartialEq, Eq)]
struct Location {
    host: String,
    port: u16,
}

impl Location {
    fn map_error(&self, err: sqlx::Error) -> DriverError {
        match err {
            sqlx::Error::Io(io_err) => self.map_io(&io_err),
            sqlx::Error::PoolTimedOut => {
                DriverError::new(format!("connect ETIMEDOUT {}:{}", self.host, self.port))
                    .with_code(TIMED_OUT)
                    .with_location(&self.host, self.port)
            }
            sqlx::Error::Database(db_err) => {
                let mut mapped = DriverError::new(db_err.message());
                if let Some(code) = db_err.code() {
                    let connect_phase = code.starts_with("08") || code == "3D000" || code == "57P03";
                    mapped = mapped.with_code(code.into_owned());
                    if connect_phase {
                        mapped = mapped.with_location(&self.host, self.port);
                    }
                }
                mapped
            }
            other => DriverError::new(other.to_string()),
        }
    }

    fn map_io(&self, err: &io::Error) -> DriverError {
        use io::ErrorKind::*;
        match err.kind() {
            ConnectionRefused => DriverError::connection_refused(&self.host, self.port),
            TimedOut => DriverError::new(format!("connect ETIMEDOUT {}:{}", self.host, self.port))
                .with_code(TIMED_OUT)
                .with_location(&self.host, self.port),
            UnexpectedEof | ConnectionReset | ConnectionAborted | BrokenPipe => {
                DriverError::new(CONNECTION_TERMINATED_MESSAGE).with_location(&self.host, self.port)
            }
            _ => DriverError::new(err.to_string()).with_location(&self.host, self.port),
        }
    }
}

/// sqlx-backed [`Driver`] over a lazily connecting pool
#[derive(Debug, Clone)]
pub struct PgDriver {
    pool: PgPool,
    location: Location,
}

impl PgDriver {
    /// Build the pool without opening any connection
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect_lazy(details: &ConnectionDetails) -> Self {
        let options = PgConnectOptions::new()
            .host(&details.host)
            .port(details.port)
            .database(&details.database)
            .username(&details.user)
            .password(&details.password);

        let pool = PgPoolOptions::new()
            .max_connections(details.max_connections)
            .acquire_timeout(Duration::from_millis(details.acquire_timeout_ms))
            .connect_lazy_with(options);

        Self {
            pool,
            location: Location {
                host: details.host.clone(),
                port: details.port,
            },
        }
    }
}

#[async_trait]
impl Driver for PgDriver {
    async fn invoke_function(&self, name: &str, params: &[Value]) -> DriverResult<Value> {
        let sql = function_call_sql(name, params)?;
        let row = self
            .pool
            .fetch_one(sql.as_str())
            .await
            .map_err(|e| self.location.map_error(e))?;
        row.try_get::<Value, _>(0)
            .map_err(|e| self.location.map_error(e))
    }

    async fn run_transaction(
        &self,
        mode: Option<&TransactionMode>,
        body: &dyn TransactionBody,
    ) -> DriverResult<Value> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| self.location.map_error(e))?;

        // The guard rolls back if this future is dropped before it settles;
        // the pool flushes that rollback before handing the connection out.
        let mut tx = Connection::begin(&mut *conn)
            .await
            .map_err(|e| self.location.map_error(e))?;

        if let Some(statement) = mode.and_then(TransactionMode::set_transaction_statement) {
            debug!(%statement, "setting transaction mode");
            (&mut *tx)
                .execute(statement.as_str())
                .await
                .map_err(|e| self.location.map_error(e))?;
        }

        let outcome = {
            let mut ctx = PgTransactionContext {
                conn: &mut *tx,
                location: &self.location,
            };
            body.run(&mut ctx).await
        };

        match outcome {
            Ok(value) => {
                tx.commit().await.map_err(|e| self.location.map_error(e))?;
                Ok(value)
            }
            Err(err) => {
                let rolled_back = tx.rollback().await;
                if let Err(rollback_err) = rolled_back {
                    warn!(error = %rollback_err, "rollback failed, discarding connection");
                    drop(conn.detach());
                }
                Err(err)
            }
        }
    }
}

/// Statements issued on the connection that holds the open transaction
struct PgTransactionContext<'c> {
    conn: &'c mut PgConnection,
    location: &'c Location,
}

#[async_trait]
impl<'c> TransactionContext for PgTransactionContext<'c> {
    async fn func(&mut self, name: &str, params: &[Value]) -> DriverResult<Value> {
        let sql = function_call_sql(name, params)?;
        let row = (&mut *self.conn)
            .fetch_one(sql.as_str())
            .await
            .map_err(|e| self.location.map_error(e))?;
        row.try_get::<Value, _>(0)
            .map_err(|e| self.location.map_error(e))
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<u64> {
        let query = params
            .iter()
            .fold(sqlx::query(sql), |query, value| bind_value(query, value));
        let result = query
            .execute(&mut *self.conn)
            .await
            .map_err(|e| self.location.map_error(e))?;
        Ok(result.rows_affected())
    }
}

/// `SELECT` wrapping a function call so the rows come back as one JSON array
pub fn function_call_sql(name: &str, params: &[Value]) -> DriverResult<String> {
    validate_function_name(name).map_err(|e| DriverError::new(e.to_string()).with_code("42602"))?;

    let args = params
        .iter()
        .map(sql_literal)
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "SELECT coalesce(json_agg(t), '[]'::json) FROM {name}({args}) AS t"
    ))
}

/// Render a JSON value as a SQL literal
///
/// Strings, arrays and objects become quoted literals of unknown type;
/// the server casts them to the function's declared parameter types.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_text(s),
        Value::Array(_) | Value::Object(_) => quote_text(&value.to_string()),
    }
}

fn quote_text(text: &str) -> String {
    let escaped = text.replace('\'', "''");
    if text.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{}'", escaped)
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => query.bind(sqlx::types::Json(value)),
    }
}

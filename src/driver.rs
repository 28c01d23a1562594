/*!
 * Driver seam: the low-level operations a database handle delegates to
 */

use async_trait::async_trait;
use pgpw_core_resilience::DatabaseFailure;
use serde_json::Value;
use thiserror::Error;

use crate::transaction::TransactionMode;

/// Failure reported by a driver call
///
/// Carries the connectivity code (`errno`-style name or SQLSTATE) and the
/// location of the database when the driver knows them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    code: Option<String>,
    message: String,
    address: Option<String>,
    port: Option<u16>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            address: None,
            port: None,
        }
    }

    /// `ECONNREFUSED` for the given location
    pub fn connection_refused(address: impl Into<String>, port: u16) -> Self {
        let address = address.into();
        Self::new(format!("connect ECONNREFUSED {address}:{port}"))
            .with_code(pgpw_core_resilience::classifier::CONNECTION_REFUSED)
            .with_location(address, port)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_location(mut self, address: impl Into<String>, port: u16) -> Self {
        self.address = Some(address.into());
        self.port = Some(port);
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Collapse a multi-error batch rejection into its first cause
    ///
    /// Batch bodies settle every statement; when several fail, only the
    /// first failure is reported.
    pub fn first_of(errors: impl IntoIterator<Item = DriverError>) -> Option<DriverError> {
        errors.into_iter().next()
    }
}

impl DatabaseFailure for DriverError {
    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    fn port(&self) -> Option<u16> {
        self.port
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Statements a transaction body can issue on its session
#[async_trait]
pub trait TransactionContext: Send {
    /// Call a database function; resolves with its rows as a JSON array
    async fn func(&mut self, name: &str, params: &[Value]) -> DriverResult<Value>;

    /// Run a statement; resolves with the number of affected rows
    async fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<u64>;
}

/// Work performed inside one transaction
///
/// A body runs once per attempt, each time on a fresh transaction, so it
/// must not depend on state left behind by an earlier attempt.
#[async_trait]
pub trait TransactionBody: Send + Sync {
    async fn run(&self, tx: &mut dyn TransactionContext) -> DriverResult<Value>;
}

/// Low-level database access owned by an initialized handle
#[async_trait]
pub trait Driver: Send + Sync {
    /// Call the named function with positional parameters
    async fn invoke_function(&self, name: &str, params: &[Value]) -> DriverResult<Value>;

    /// Open a transaction with `mode`, run `body`, then commit, or roll
    /// back if the body failed
    async fn run_transaction(
        &self,
        mode: Option<&TransactionMode>,
        body: &dyn TransactionBody,
    ) -> DriverResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgpw_core_resilience::is_unavailable;

    #[test]
    fn test_connection_refused_is_unavailable() {
        let err = DriverError::connection_refused("127.0.0.1", 5432);
        assert!(is_unavailable(&err));
        assert_eq!(err.code(), Some("ECONNREFUSED"));
        assert_eq!(err.address(), Some("127.0.0.1"));
        assert_eq!(err.port(), Some(5432));
        assert_eq!(err.to_string(), "connect ECONNREFUSED 127.0.0.1:5432");
    }

    #[test]
    fn test_sqlstate_codes() {
        assert!(is_unavailable(&DriverError::new("starting").with_code("57P03")));
        assert!(!is_unavailable(
            &DriverError::new("duplicate key value").with_code("23505")
        ));
    }

    #[test]
    fn test_first_of() {
        let first = DriverError::new("first");
        let second = DriverError::new("second");
        assert_eq!(
            DriverError::first_of(vec![first.clone(), second]),
            Some(first)
        );
        assert_eq!(DriverError::first_of(Vec::new()), None);
    }
}

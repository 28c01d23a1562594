/*!
 * Database handles
 *
 * A handle is a named binding that is either uninitialized or carries a
 * live driver session plus an optional default retry configuration. A
 * session is attached at most once and is never replaced.
 */

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use pgpw_core_resilience::{RetryConfig, RetryOverride};
use serde_json::Value;

use crate::driver::{Driver, TransactionBody};
use crate::error::{Error, Result};
use crate::transaction::{IsolationLevel, TransactionMode};

/// Per-call execution options
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExecOptions {
    /// Retry choice for this call
    pub retry: RetryOverride,
}

impl ExecOptions {
    /// Use `config` for this call instead of the handle default
    pub fn with_retry(config: RetryConfig) -> Self {
        Self {
            retry: RetryOverride::Custom(config),
        }
    }

    /// Ignore the handle default and make a single attempt
    pub fn no_retry() -> Self {
        Self {
            retry: RetryOverride::UseGlobalDefault,
        }
    }
}

/// Live connection state of an initialized handle
#[derive(Clone)]
pub struct Session {
    driver: Arc<dyn Driver>,
    retry: Option<RetryConfig>,
}

impl Session {
    pub fn new(driver: Arc<dyn Driver>, retry: Option<RetryConfig>) -> Self {
        Self { driver, retry }
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Default retry configuration bound at initialization
    pub fn retry(&self) -> Option<&RetryConfig> {
        self.retry.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Named database handle
#[derive(Debug)]
pub struct Database {
    name: String,
    session: OnceCell<Session>,
}

impl Database {
    /// Uninitialized handle
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            session: OnceCell::new(),
        }
    }

    /// Handle bound to `driver` right away
    pub fn with_driver(
        name: impl Into<String>,
        driver: Arc<dyn Driver>,
        retry: Option<RetryConfig>,
    ) -> Self {
        Self {
            name: name.into(),
            session: OnceCell::with_value(Session::new(driver, retry)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.session.get().is_some()
    }

    /// The attached session, or `NotInitialized`
    pub fn session(&self) -> Result<&Session> {
        self.session.get().ok_or_else(|| Error::NotInitialized {
            name: self.name.clone(),
        })
    }

    /// Default retry configuration, if the handle was initialized with one
    pub fn default_retry(&self) -> Option<RetryConfig> {
        self.session.get().and_then(|s| s.retry)
    }

    /// Isolation levels accepted by [`TransactionMode`]
    pub fn isolation_levels(&self) -> [IsolationLevel; 3] {
        IsolationLevel::ALL
    }

    pub(crate) fn attach(&self, session: Session) -> Result<()> {
        self.session
            .set(session)
            .map_err(|_| Error::AlreadyInitialized {
                name: self.name.clone(),
            })
    }
}

/// Operations shared by real handles and stubs
///
/// Application code written against this trait can run on a
/// [`Database`] in production and on a [`StubHandle`](crate::stubs::StubHandle)
/// in tests.
#[async_trait]
pub trait DatabaseOps: Send + Sync {
    /// Call a database function with retries
    async fn exec_func(&self, name: &str, params: &[Value], options: &ExecOptions)
        -> Result<Value>;

    /// Run `body` in a transaction with retries
    async fn transaction(
        &self,
        mode: Option<TransactionMode>,
        body: &dyn TransactionBody,
        options: &ExecOptions,
    ) -> Result<Value>;
}

#[async_trait]
impl DatabaseOps for Database {
    async fn exec_func(
        &self,
        name: &str,
        params: &[Value],
        options: &ExecOptions,
    ) -> Result<Value> {
        crate::exec_func::exec_func(self, name, params, options).await
    }

    async fn transaction(
        &self,
        mode: Option<TransactionMode>,
        body: &dyn TransactionBody,
        options: &ExecOptions,
    ) -> Result<Value> {
        crate::transaction::transaction(self, mode, body, options).await
    }
}

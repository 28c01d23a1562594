/*!
 * pgpw - PostgreSQL wrapper with connectivity-aware retries
 *
 * Named database handles for calling server-side functions and running
 * transactions:
 * - Calls that fail because the database is unreachable are retried with
 *   exponential backoff; every other failure surfaces immediately
 * - Retry configuration per call, per handle, or a global default
 * - Transaction modes (isolation level, read-only, deferrable)
 * - Stub handles for testing application code without a database
 *
 * The retry engine itself lives in the `pgpw-core-resilience` crate.
 *
 * Version: 0.3.0
 * Author: Shane Wall <shaneawall@gmail.com>
 */

pub mod config;
pub mod database;
pub mod driver;
pub mod error;
pub mod exec_func;
pub mod logging;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod registry;
pub mod stubs;
pub mod transaction;
pub mod validation;

use std::sync::Arc;

// Re-export commonly used types
pub use config::{ConnectionDetails, PgpwConfig};
pub use database::{Database, DatabaseOps, ExecOptions};
pub use driver::{Driver, DriverError, TransactionBody, TransactionContext};
pub use error::{Error, Result};
pub use exec_func::exec_func;
pub use pgpw_core_resilience::{ErrorKind, RetryConfig, RetryOverride};
pub use registry::Registry;
pub use transaction::{transaction, IsolationLevel, Statement, TransactionMode, TransactionPlan};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Handle called `name` in the process-wide registry
pub fn database(name: &str) -> Arc<Database> {
    Registry::global().database(name)
}

/// Initialize the handle called `name` in the process-wide registry
#[cfg(feature = "postgres")]
pub fn init(name: &str, details: &ConnectionDetails, retry: Option<RetryConfig>) -> Result<()> {
    Registry::global().init(name, details, retry)
}

/// Initialize the handle called `name` in the process-wide registry with a
/// caller-supplied driver
pub fn init_with_driver(
    name: &str,
    driver: Arc<dyn Driver>,
    retry: Option<RetryConfig>,
) -> Result<()> {
    Registry::global().init_with_driver(name, driver, retry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_global_registry_shares_handles() {
        let a = database("lib-tests-shared");
        let b = database("lib-tests-shared");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!a.is_initialized());
    }
}

/*!
 * Registry of named database handles
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;
use pgpw_core_resilience::RetryConfig;
use tracing::info;

#[cfg(feature = "postgres")]
use crate::config::ConnectionDetails;
use crate::database::{Database, Session};
use crate::driver::Driver;
use crate::error::{Error, Result};
#[cfg(feature = "postgres")]
use crate::validation::validate_init_params;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Maps names to handles; a handle keeps its identity for the registry's
/// lifetime, so references taken before `init` see the attached session.
#[derive(Debug, Default)]
pub struct Registry {
    databases: Mutex<HashMap<String, Arc<Database>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Get the handle called `name`, creating an uninitialized one if needed
    pub fn database(&self, name: &str) -> Arc<Database> {
        let mut databases = self.lock();
        databases
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Database::new(name)))
            .clone()
    }

    /// Names of every known handle, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Attach connection details and an optional default retry
    /// configuration to the handle called `name`
    ///
    /// Fails with `AlreadyInitialized` before looking at the details if the
    /// handle already has a session. Must be called from within a Tokio
    /// runtime; no connection is opened until the first call.
    #[cfg(feature = "postgres")]
    pub fn init(
        &self,
        name: &str,
        details: &ConnectionDetails,
        retry: Option<RetryConfig>,
    ) -> Result<()> {
        self.ensure_uninitialized(name)?;
        validate_init_params(name, details)?;

        let driver = Arc::new(crate::postgres::PgDriver::connect_lazy(details));
        self.attach(name, driver, retry)?;

        info!(
            db = name,
            host = %details.host,
            port = details.port,
            database = %details.database,
            "database handle initialized"
        );
        Ok(())
    }

    /// Like [`init`](Self::init), with a caller-supplied driver
    pub fn init_with_driver(
        &self,
        name: &str,
        driver: Arc<dyn Driver>,
        retry: Option<RetryConfig>,
    ) -> Result<()> {
        self.ensure_uninitialized(name)?;
        if name.is_empty() {
            return Err(Error::Validation(
                "parameter \"name\" must be a non-empty string".to_string(),
            ));
        }

        self.attach(name, driver, retry)?;
        info!(db = name, "database handle initialized with custom driver");
        Ok(())
    }

    /// Initialize every database listed in `config`
    ///
    /// All entries are checked before any handle is attached, so a failure
    /// leaves every handle as it was.
    #[cfg(feature = "postgres")]
    pub fn init_from_config(&self, config: &crate::config::PgpwConfig) -> Result<()> {
        for (name, db) in &config.databases {
            self.ensure_uninitialized(name)?;
            validate_init_params(name, &db.connection)?;
        }

        for (name, db) in &config.databases {
            self.init(name, &db.connection, db.retry)?;
        }
        Ok(())
    }

    fn ensure_uninitialized(&self, name: &str) -> Result<()> {
        match self.lock().get(name) {
            Some(db) if db.is_initialized() => Err(Error::AlreadyInitialized {
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn attach(&self, name: &str, driver: Arc<dyn Driver>, retry: Option<RetryConfig>) -> Result<()> {
        self.database(name).attach(Session::new(driver, retry))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Database>>> {
        self.databases.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

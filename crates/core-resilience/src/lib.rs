//! PGPW Core Resilience: pure-logic retry engine for database calls
//!
//! # Overview
//!
//! This crate decides *whether* and *when* a failed database operation is
//! attempted again. It includes:
//!
//! - **Classifier**: tells transient unavailability (connection refused,
//!   timeout, missing database, database starting up, abrupt disconnect)
//!   apart from every other failure
//! - **Backoff**: exponential delay per attempt number
//! - **Attempt**: one timed invocation of an operation
//! - **Retry controller**: the attempt loop and its terminal outcomes
//! - **Policy**: validated [`RetryConfig`] values and per-call resolution
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - SQL or any particular database driver
//! - Connection pools or sessions
//! - Where configuration comes from
//!
//! Drivers plug in by implementing [`DatabaseFailure`] for their error type.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     Operation façade (exec / tx)        │
//! └─────────────┬───────────────────────────┘
//!               │ per-call / handle / global config
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Policy resolution                 │  ← one RetryConfig per call
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Retry controller                  │  ← sequential attempt loop
//! │  backoff::delay_ms → attempt::attempt   │
//! └─────────────┬───────────────────────────┘
//!               │ on failure
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Classifier                        │  ← unavailable vs unexpected
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use pgpw_core_resilience::{policy, retry, RetryConfig, RetryOverride, DatabaseFailure};
//!
//! # #[derive(Debug)]
//! # struct DriverError;
//! # impl std::fmt::Display for DriverError {
//! #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("e") }
//! # }
//! # impl std::error::Error for DriverError {}
//! # impl DatabaseFailure for DriverError {
//! #     fn code(&self) -> Option<&str> { None }
//! #     fn message(&self) -> &str { "e" }
//! # }
//! # async fn call_driver() -> Result<u64, DriverError> { Ok(1) }
//! # async fn example() {
//! let handle_default = RetryConfig::new(100, 3, 2.0).unwrap();
//! let config = policy::resolve(
//!     &RetryOverride::Inherit,
//!     Some(&handle_default),
//!     &RetryConfig::NO_RETRY,
//! );
//!
//! let rows = retry::execute(&config, "function \"count_users\"", || call_driver()).await;
//! # }
//! ```

pub mod attempt;
pub mod backoff;
pub mod classifier;
pub mod error;
pub mod policy;
pub mod retry;

// Re-export main types for convenience
pub use classifier::{is_unavailable, DatabaseFailure};
pub use error::{ErrorKind, RetryError};
pub use policy::{resolve, InvalidRetryConfig, RetryConfig, RetryOverride};

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use pgpw_core_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::classifier::{is_unavailable, DatabaseFailure};
    pub use super::error::{ErrorKind, RetryError};
    pub use super::policy::{resolve, RetryConfig, RetryOverride};
    pub use super::retry::execute;
}

/*!
 * Error types for pgpw
 */

use pgpw_core_resilience::{ErrorKind, InvalidRetryConfig, RetryError};
use thiserror::Error;

use crate::driver::DriverError;

pub type Result<T> = std::result::Result<T, Error>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input, rejected before any attempt
    #[error("{0}")]
    Validation(String),

    /// The handle has no connection details attached
    #[error("database \"{name}\" is not initialized with connection details")]
    NotInitialized { name: String },

    /// `init` was called twice for the same handle
    #[error("database connection \"{name}\" is already initialized")]
    AlreadyInitialized { name: String },

    /// Connectivity failure that outlived the retry budget
    #[error("failed connecting to database")]
    DatabaseUnavailable {
        address: Option<String>,
        port: Option<u16>,
    },

    /// Any other failure from the driver; never retried
    #[error("an error occurred while executing {context}")]
    Unexpected {
        context: String,
        #[source]
        source: DriverError,
    },

    /// Configuration file could not be used
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable discriminator, identical for equal failure classes
    ///
    /// Input problems (including uninitialized handles and configuration
    /// mistakes) all report `"ValidationError"`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_)
            | Error::NotInitialized { .. }
            | Error::AlreadyInitialized { .. }
            | Error::Config(_) => ErrorKind::Validation,
            Error::DatabaseUnavailable { .. } => ErrorKind::DatabaseUnavailable,
            Error::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Name tag callers can match on, e.g. `"DatabaseUnavailable"`
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Only connectivity failures are worth trying again later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::DatabaseUnavailable { .. })
    }

    /// The wrapped driver failure of an `Unexpected` error
    pub fn cause(&self) -> Option<&DriverError> {
        match self {
            Error::Unexpected { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_)
            | Error::NotInitialized { .. }
            | Error::AlreadyInitialized { .. }
            | Error::Config(_) => EXIT_USAGE,
            Error::DatabaseUnavailable { .. } | Error::Unexpected { .. } => EXIT_FAILURE,
        }
    }
}

impl From<InvalidRetryConfig> for Error {
    fn from(err: InvalidRetryConfig) -> Self {
        Error::Validation(err.to_string())
    }
}

impl From<RetryError<DriverError>> for Error {
    fn from(err: RetryError<DriverError>) -> Self {
        match err {
            RetryError::DatabaseUnavailable { address, port } => {
                Error::DatabaseUnavailable { address, port }
            }
            RetryError::Unexpected { context, cause } => Error::Unexpected {
                context,
                source: cause,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Error::Validation("x".into()).name(), "ValidationError");
        assert_eq!(
            Error::NotInitialized { name: "main".into() }.name(),
            "ValidationError"
        );
        assert_eq!(
            Error::DatabaseUnavailable {
                address: None,
                port: None
            }
            .name(),
            "DatabaseUnavailable"
        );
        assert_eq!(
            Error::Unexpected {
                context: "transaction".into(),
                source: DriverError::new("boom"),
            }
            .name(),
            "UnexpectedError"
        );
    }

    #[test]
    fn test_retry_error_conversion_keeps_fields() {
        let err: Error = RetryError::<DriverError>::DatabaseUnavailable {
            address: Some("10.0.0.5".into()),
            port: Some(5433),
        }
        .into();

        match err {
            Error::DatabaseUnavailable { address, port } => {
                assert_eq!(address.as_deref(), Some("10.0.0.5"));
                assert_eq!(port, Some(5433));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err: Error = RetryError::Unexpected {
            context: "transaction".to_string(),
            cause: DriverError::new("duplicate key").with_code("23505"),
        }
        .into();
        assert_eq!(err.cause().and_then(|c| c.code()), Some("23505"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::Config("bad".into()).exit_code(), EXIT_USAGE);
        assert_eq!(
            Error::DatabaseUnavailable {
                address: None,
                port: None
            }
            .exit_code(),
            EXIT_FAILURE
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::NotInitialized { name: "main".into() }.to_string(),
            "database \"main\" is not initialized with connection details"
        );
        assert_eq!(
            Error::AlreadyInitialized { name: "main".into() }.to_string(),
            "database connection \"main\" is already initialized"
        );
    }
}

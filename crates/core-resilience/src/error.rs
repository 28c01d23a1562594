//! Error types for the retry engine

use thiserror::Error;

/// Stable discriminator for the failure classes callers see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input rejected before any attempt was made, such as an invalid
    /// [`RetryConfig`](crate::RetryConfig)
    Validation,
    /// Transient connectivity failure that outlived the retry budget
    DatabaseUnavailable,
    /// Any other failure reported by the driver
    Unexpected,
}

impl ErrorKind {
    /// Name used in logs and by callers that match on a string tag
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::DatabaseUnavailable => "DatabaseUnavailable",
            ErrorKind::Unexpected => "UnexpectedError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal outcome of a retried database operation
///
/// `E` is the driver's own failure type. Only the failure of the final
/// attempt is ever carried; intermediate transient failures are absorbed.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Every permitted attempt failed with a connectivity error
    #[error("failed connecting to database")]
    DatabaseUnavailable {
        /// Address reported by the last failed attempt
        address: Option<String>,
        /// Port reported by the last failed attempt
        port: Option<u16>,
    },

    /// Non-transient failure; never retried
    #[error("an error occurred while executing {context}")]
    Unexpected {
        /// Human readable operation description, e.g. `function "get_one"`
        context: String,
        #[source]
        cause: E,
    },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Discriminator for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetryError::DatabaseUnavailable { .. } => ErrorKind::DatabaseUnavailable,
            RetryError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Shorthand for `self.kind().name()`
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// The wrapped driver failure, if this is an `Unexpected` error
    pub fn cause(&self) -> Option<&E> {
        match self {
            RetryError::Unexpected { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

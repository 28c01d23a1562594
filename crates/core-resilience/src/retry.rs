//! Retry controller
//!
//! Runs an operation, classifies each failure and either schedules another
//! attempt or ends the call:
//!
//! ```text
//!   attempting ──ok──────────────────────────────▶ succeeded
//!       │
//!       └─err─▶ unexpected? ─yes─────────────────▶ failed-unexpected
//!                    │no
//!                    ▼
//!            attempt < max_attempts? ─no─────────▶ failed-unavailable
//!                    │yes
//!                    ▼
//!             retry-scheduled (delay) ──▶ attempting
//! ```
//!
//! Attempts for one call are strictly sequential; nothing is shared between
//! concurrent calls.

use crate::attempt::attempt;
use crate::backoff;
use crate::classifier::{is_unavailable, DatabaseFailure};
use crate::error::RetryError;
use crate::policy::RetryConfig;
use std::future::Future;
use tracing::{debug, warn};

/// Run `op` under `config`, retrying transient unavailability
///
/// `context` names the operation in the `Unexpected` error message, e.g.
/// `function "get_one_by_id"` or `transaction`. The operation is called
/// afresh for every attempt.
///
/// # Example
/// ```
/// use pgpw_core_resilience::{retry, DatabaseFailure, RetryConfig};
///
/// #[derive(Debug)]
/// struct Refused;
/// impl std::fmt::Display for Refused {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         f.write_str("connect ECONNREFUSED")
///     }
/// }
/// impl std::error::Error for Refused {}
/// impl DatabaseFailure for Refused {
///     fn code(&self) -> Option<&str> { Some("ECONNREFUSED") }
///     fn message(&self) -> &str { "connect ECONNREFUSED" }
/// }
///
/// # tokio_test::block_on(async {
/// let config = RetryConfig::new(0, 2, 1.0).unwrap();
/// let err = retry::execute(&config, "transaction", || async { Err::<(), _>(Refused) })
///     .await
///     .unwrap_err();
/// assert_eq!(err.name(), "DatabaseUnavailable");
/// # });
/// ```
pub async fn execute<F, Fut, T, E>(
    config: &RetryConfig,
    context: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: DatabaseFailure,
{
    let mut attempt_num: u32 = 0;

    loop {
        let delay_ms = backoff::delay_ms(config, attempt_num);
        debug!(attempt = attempt_num, delay_ms, context, "attempting database operation");

        let err = match attempt(delay_ms, &mut op).await {
            Ok(data) => return Ok(data),
            Err(err) => err,
        };

        if !is_unavailable(&err) {
            debug!(attempt = attempt_num, context, error = %err, "non-transient failure");
            return Err(RetryError::Unexpected {
                context: context.to_string(),
                cause: err,
            });
        }

        if attempt_num >= config.max_attempts() {
            warn!(
                attempts = attempt_num + 1,
                context,
                error = %err,
                "database unavailable, retry budget exhausted"
            );
            return Err(RetryError::DatabaseUnavailable {
                address: err.address().map(str::to_owned),
                port: err.port(),
            });
        }

        attempt_num += 1;
        warn!(
            next_attempt = attempt_num,
            max_attempts = config.max_attempts(),
            next_delay_ms = backoff::delay_ms(config, attempt_num),
            context,
            error = %err,
            "database unavailable, scheduling retry"
        );
    }
}

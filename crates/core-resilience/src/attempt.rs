//! Single timed attempt of a database operation

use std::future::Future;
use std::time::Duration;

/// Wait `delay_ms`, then run `op` once and return its result untouched
///
/// A zero delay invokes the operation immediately without touching the
/// timer. The wait does not hold any lock or connection.
pub async fn attempt<F, Fut, T, E>(delay_ms: u64, op: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    op().await
}

/*!
 * execFunc: call a single database function with retries
 */

use pgpw_core_resilience::{policy, retry, RetryConfig};
use serde_json::Value;
use tracing::instrument;

use crate::database::{Database, ExecOptions};
use crate::error::Result;
use crate::validation::validate_function_name;

/// Call the function `name` with positional `params` on `db`
///
/// The name is validated and the handle must be initialized before the
/// retry policy is resolved; both failures surface without any attempt.
/// The call is retried while the database is unavailable, up to the
/// resolved retry budget.
///
/// # Errors
/// - [`Error::Validation`](crate::Error::Validation) for a malformed name
/// - [`Error::NotInitialized`](crate::Error::NotInitialized)
/// - [`Error::DatabaseUnavailable`](crate::Error::DatabaseUnavailable) once the budget is spent
/// - [`Error::Unexpected`](crate::Error::Unexpected) for any other driver failure
#[instrument(skip(db, params, options), fields(db = db.name()))]
pub async fn exec_func(
    db: &Database,
    name: &str,
    params: &[Value],
    options: &ExecOptions,
) -> Result<Value> {
    validate_function_name(name)?;

    let session = db.session()?;
    let config = policy::resolve(&options.retry, session.retry(), &RetryConfig::NO_RETRY);
    let driver = session.driver();
    let context = format!("function \"{name}\"");

    let data = retry::execute(&config, &context, || driver.invoke_function(name, params)).await?;

    Ok(data)
}

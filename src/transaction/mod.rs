/*!
 * transaction: run several statements atomically on one session, with retries
 */

mod mode;
mod plan;

pub use mode::{IsolationLevel, TransactionMode};
pub use plan::{Statement, TransactionPlan};

use pgpw_core_resilience::{policy, retry, RetryConfig};
use serde_json::Value;
use tracing::instrument;

use crate::database::{Database, ExecOptions};
use crate::driver::TransactionBody;
use crate::error::Result;

/// Run `body` inside a transaction on `db`
///
/// `mode` is turned into the `BEGIN` command; `None` opens a plain
/// transaction. Every attempt opens a fresh transaction and runs the whole
/// body again; the driver commits on success and rolls back on failure.
///
/// ```no_run
/// use pgpw::transaction::{transaction, IsolationLevel, Statement, TransactionMode, TransactionPlan};
/// use pgpw::ExecOptions;
/// use serde_json::json;
///
/// # async fn example(db: &pgpw::Database) -> pgpw::Result<()> {
/// let plan = TransactionPlan::Sequence(vec![
///     Statement::func("debit", vec![json!("acc-1"), json!(10)]),
///     Statement::func("credit", vec![json!("acc-2"), json!(10)]),
/// ]);
/// let mode = TransactionMode::new().isolation_level(IsolationLevel::Serializable);
///
/// let results = transaction(db, Some(mode), &plan, &ExecOptions::default()).await?;
/// # Ok(())
/// # }
/// ```
#[instrument(skip(db, body, options), fields(db = db.name()))]
pub async fn transaction(
    db: &Database,
    mode: Option<TransactionMode>,
    body: &dyn TransactionBody,
    options: &ExecOptions,
) -> Result<Value> {
    let session = db.session()?;
    let config = policy::resolve(&options.retry, session.retry(), &RetryConfig::NO_RETRY);
    let driver = session.driver();

    let data = retry::execute(&config, "transaction", || {
        driver.run_transaction(mode.as_ref(), body)
    })
    .await?;

    Ok(data)
}

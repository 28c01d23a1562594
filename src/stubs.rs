/*!
 * Stub handles for tests of application code
 *
 * A stub handle answers `exec_func` and `transaction` with canned results
 * instead of talking to a database. Each operation takes either a single
 * responder, used for every call, or an ordered sequence of responders
 * where the last one keeps answering once the sequence is exhausted.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::database::{DatabaseOps, ExecOptions};
use crate::driver::TransactionBody;
use crate::error::Result;
use crate::transaction::TransactionMode;

/// Produces the outcome of one stubbed call
pub type Responder = Arc<dyn Fn() -> Result<Value> + Send + Sync>;

/// Responder that always resolves with `value`
pub fn resolve_with(value: Value) -> Responder {
    Arc::new(move || Ok(value.clone()))
}

/// Responder that always fails with a fresh error from `make_err`
pub fn reject_with<F>(make_err: F) -> Responder
where
    F: Fn() -> crate::Error + Send + Sync + 'static,
{
    Arc::new(move || Err(make_err()))
}

/// Responders for one operation plus the shared call counter
struct ResponderSequence {
    responders: Vec<Responder>,
    calls: AtomicUsize,
}

impl ResponderSequence {
    fn new(responders: Vec<Responder>) -> Self {
        Self {
            responders,
            calls: AtomicUsize::new(0),
        }
    }

    fn respond(&self) -> Result<Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responders.len() {
            0 => Ok(Value::Null),
            len => (self.responders[call.min(len - 1)])(),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Builder for a [`StubProvider`]
///
/// Operations without configured responders resolve with `null`.
///
/// ```
/// use pgpw::stubs::{resolve_with, Stubs};
/// use pgpw::{DatabaseOps, ExecOptions};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let provider = Stubs::new()
///     .exec_func_sequence(vec![resolve_with(json!(1)), resolve_with(json!(2))])
///     .build();
/// let db = provider.handle("main");
///
/// let opts = ExecOptions::default();
/// assert_eq!(db.exec_func("f", &[], &opts).await.unwrap(), json!(1));
/// assert_eq!(db.exec_func("f", &[], &opts).await.unwrap(), json!(2));
/// assert_eq!(db.exec_func("f", &[], &opts).await.unwrap(), json!(2));
/// # });
/// ```
#[derive(Default)]
pub struct Stubs {
    exec_func: Vec<Responder>,
    transaction: Vec<Responder>,
}

impl Stubs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `exec_func` call with `responder`
    pub fn exec_func(mut self, responder: Responder) -> Self {
        self.exec_func = vec![responder];
        self
    }

    /// Answer `exec_func` calls in order, repeating the last responder
    pub fn exec_func_sequence(mut self, responders: Vec<Responder>) -> Self {
        self.exec_func = responders;
        self
    }

    /// Answer every `transaction` call with `responder`
    pub fn transaction(mut self, responder: Responder) -> Self {
        self.transaction = vec![responder];
        self
    }

    /// Answer `transaction` calls in order, repeating the last responder
    pub fn transaction_sequence(mut self, responders: Vec<Responder>) -> Self {
        self.transaction = responders;
        self
    }

    pub fn build(self) -> StubProvider {
        StubProvider {
            exec_func: Arc::new(ResponderSequence::new(self.exec_func)),
            transaction: Arc::new(ResponderSequence::new(self.transaction)),
        }
    }
}

/// Hands out stub handles; every handle shares the provider's sequences
#[derive(Clone)]
pub struct StubProvider {
    exec_func: Arc<ResponderSequence>,
    transaction: Arc<ResponderSequence>,
}

impl StubProvider {
    /// Stub standing in for the handle called `name`
    pub fn handle(&self, name: &str) -> StubHandle {
        StubHandle {
            name: name.to_string(),
            exec_func: self.exec_func.clone(),
            transaction: self.transaction.clone(),
        }
    }

    /// Number of `exec_func` calls answered so far
    pub fn exec_func_calls(&self) -> usize {
        self.exec_func.calls()
    }

    /// Number of `transaction` calls answered so far
    pub fn transaction_calls(&self) -> usize {
        self.transaction.calls()
    }
}

/// Substitute for a [`Database`](crate::Database) handle
#[derive(Clone)]
pub struct StubHandle {
    name: String,
    exec_func: Arc<ResponderSequence>,
    transaction: Arc<ResponderSequence>,
}

impl StubHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl DatabaseOps for StubHandle {
    async fn exec_func(
        &self,
        _name: &str,
        _params: &[Value],
        _options: &ExecOptions,
    ) -> Result<Value> {
        self.exec_func.respond()
    }

    async fn transaction(
        &self,
        _mode: Option<TransactionMode>,
        _body: &dyn TransactionBody,
        _options: &ExecOptions,
    ) -> Result<Value> {
        self.transaction.respond()
    }
}

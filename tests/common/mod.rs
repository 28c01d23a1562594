//! In-memory driver shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pgpw::driver::DriverResult;
use pgpw::{Driver, DriverError, TransactionBody, TransactionContext, TransactionMode};
use serde_json::{json, Value};

/// Driver that answers from a script of outcomes
///
/// Each call pops the next scripted outcome; once the script is empty the
/// fallback answers. For transactions an `Err` outcome stands for a failure
/// to open the transaction; an `Ok` outcome lets the body run against an
/// in-memory context.
pub struct ScriptedDriver {
    script: Mutex<VecDeque<DriverResult<Value>>>,
    fallback: DriverResult<Value>,
    calls: AtomicUsize,
    modes: Mutex<Vec<Option<TransactionMode>>>,
}

impl ScriptedDriver {
    pub fn new(script: Vec<DriverResult<Value>>, fallback: DriverResult<Value>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            modes: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `err`
    pub fn failing(err: DriverError) -> Self {
        Self::new(Vec::new(), Err(err))
    }

    /// Every call succeeds with `value`
    pub fn answering(value: Value) -> Self {
        Self::new(Vec::new(), Ok(value))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn modes(&self) -> Vec<Option<TransactionMode>> {
        self.modes.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> DriverResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn invoke_function(&self, _name: &str, _params: &[Value]) -> DriverResult<Value> {
        self.next_outcome()
    }

    async fn run_transaction(
        &self,
        mode: Option<&TransactionMode>,
        body: &dyn TransactionBody,
    ) -> DriverResult<Value> {
        self.modes.lock().unwrap().push(mode.copied());
        self.next_outcome()?;
        body.run(&mut MemoryContext).await
    }
}

/// Answers every function with a one-row result; functions named
/// `fail_*` raise a plain SQL error
pub struct MemoryContext;

#[async_trait]
impl TransactionContext for MemoryContext {
    async fn func(&mut self, name: &str, params: &[Value]) -> DriverResult<Value> {
        if name.starts_with("fail_") {
            return Err(DriverError::new(format!("{name} raised an exception")).with_code("P0001"));
        }
        Ok(json!([{ "fn": name, "params": params }]))
    }

    async fn execute(&mut self, _sql: &str, _params: &[Value]) -> DriverResult<u64> {
        Ok(1)
    }
}

pub fn refused() -> DriverError {
    DriverError::connection_refused("127.0.0.1", 5432)
}

/*!
 * Ready-made transaction bodies
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::driver::{DriverError, DriverResult, TransactionBody, TransactionContext};

/// One statement inside a transaction plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    /// Call a database function; yields its rows
    Func {
        name: String,
        #[serde(default)]
        params: Vec<Value>,
    },
    /// Run a statement; yields the affected row count
    Execute {
        sql: String,
        #[serde(default)]
        params: Vec<Value>,
    },
}

impl Statement {
    pub fn func(name: impl Into<String>, params: Vec<Value>) -> Self {
        Statement::Func {
            name: name.into(),
            params,
        }
    }

    pub fn execute(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Statement::Execute {
            sql: sql.into(),
            params,
        }
    }

    async fn run(&self, tx: &mut dyn TransactionContext) -> DriverResult<Value> {
        match self {
            Statement::Func { name, params } => tx.func(name, params).await,
            Statement::Execute { sql, params } => tx.execute(sql, params).await.map(Value::from),
        }
    }
}

/// Statements run inside one transaction
///
/// Resolves with a JSON array holding each statement's result in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "statements", rename_all = "snake_case")]
pub enum TransactionPlan {
    /// Issue every statement and settle all of them; if any failed, the
    /// first failure is reported
    Batch(Vec<Statement>),
    /// Issue statements one after another, stopping at the first failure
    Sequence(Vec<Statement>),
}

#[async_trait]
impl TransactionBody for TransactionPlan {
    async fn run(&self, tx: &mut dyn TransactionContext) -> DriverResult<Value> {
        match self {
            TransactionPlan::Sequence(statements) => {
                let mut results = Vec::with_capacity(statements.len());
                for statement in statements {
                    results.push(statement.run(tx).await?);
                }
                Ok(Value::Array(results))
            }
            TransactionPlan::Batch(statements) => {
                let mut results = Vec::with_capacity(statements.len());
                let mut errors = Vec::new();
                for statement in statements {
                    match statement.run(tx).await {
                        Ok(value) => results.push(value),
                        Err(err) => errors.push(err),
                    }
                }
                match DriverError::first_of(errors) {
                    Some(err) => Err(err),
                    None => Ok(Value::Array(results)),
                }
            }
        }
    }
}

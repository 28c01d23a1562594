/*!
 * Transaction mode: isolation level, access mode and deferrable flag
 */

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Isolation levels a transaction can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IsolationLevel {
    Serializable,
    RepeatableRead,
    ReadCommitted,
}

impl IsolationLevel {
    /// Every supported level
    pub const ALL: [IsolationLevel; 3] = [
        IsolationLevel::Serializable,
        IsolationLevel::RepeatableRead,
        IsolationLevel::ReadCommitted,
    ];

    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::Serializable => "SERIALIZABLE",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
        }
    }

    /// Lenient lookup by name; unknown names mean "no isolation clause"
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "serializable" => Some(IsolationLevel::Serializable),
            "repeatableRead" => Some(IsolationLevel::RepeatableRead),
            "readCommitted" => Some(IsolationLevel::ReadCommitted),
            _ => None,
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Settings applied to a transaction right after it opens
///
/// `read_only` and `deferrable` are tri-state: `Some(true)`, `Some(false)`
/// or unset. An unset flag adds nothing. `deferrable` is only honoured for
/// serializable, read-only transactions.
///
/// Deserialization is lenient: an unknown isolation level and a flag that
/// is not a boolean are treated as unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMode {
    #[serde(default, deserialize_with = "lenient_isolation_level")]
    pub isolation_level: Option<IsolationLevel>,
    #[serde(default, rename = "isReadOnly", deserialize_with = "lenient_flag")]
    pub read_only: Option<bool>,
    #[serde(default, rename = "isDeferrable", deserialize_with = "lenient_flag")]
    pub deferrable: Option<bool>,
}

fn lenient_isolation_level<'de, D>(deserializer: D) -> Result<Option<IsolationLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Name(String),
        Other(IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Name(name) => IsolationLevel::from_name(&name),
        Raw::Other(_) => None,
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Other(IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Flag(flag) => Some(flag),
        Raw::Other(_) => None,
    })
}

impl TransactionMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = Some(deferrable);
        self
    }

    /// Whether the deferrable flag takes effect
    pub fn deferrable_applies(&self) -> bool {
        self.isolation_level == Some(IsolationLevel::Serializable) && self.read_only == Some(true)
    }

    /// Transaction characteristics, e.g. `ISOLATION LEVEL SERIALIZABLE READ ONLY`,
    /// or `None` when nothing is set
    pub fn characteristics(&self) -> Option<String> {
        let mut parts = Vec::new();

        if let Some(level) = self.isolation_level {
            parts.push(format!("ISOLATION LEVEL {}", level.as_sql()));
        }

        match self.read_only {
            Some(true) => parts.push("READ ONLY".to_string()),
            Some(false) => parts.push("READ WRITE".to_string()),
            None => {}
        }

        if self.deferrable_applies() {
            match self.deferrable {
                Some(true) => parts.push("DEFERRABLE".to_string()),
                Some(false) => parts.push("NOT DEFERRABLE".to_string()),
                None => {}
            }
        }

        (!parts.is_empty()).then(|| parts.join(" "))
    }

    /// The `SET TRANSACTION` command issued first inside the transaction
    ///
    /// ```
    /// use pgpw::transaction::{IsolationLevel, TransactionMode};
    ///
    /// let mode = TransactionMode::new()
    ///     .isolation_level(IsolationLevel::Serializable)
    ///     .read_only(true)
    ///     .deferrable(true);
    /// assert_eq!(
    ///     mode.set_transaction_statement().as_deref(),
    ///     Some("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE READ ONLY DEFERRABLE")
    /// );
    /// assert_eq!(TransactionMode::new().set_transaction_statement(), None);
    /// ```
    pub fn set_transaction_statement(&self) -> Option<String> {
        self.characteristics()
            .map(|characteristics| format!("SET TRANSACTION {characteristics}"))
    }
}

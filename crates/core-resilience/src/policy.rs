//! Retry configuration and policy resolution
//!
//! A [`RetryConfig`] is validated once, when it is built, and is read-only
//! afterwards. Resolution picks one configuration for a call out of the
//! per-call override, the handle's bound default and the global default.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected retry configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidRetryConfig(String);

/// Exponential backoff settings for one logical database operation
///
/// - `initial_delay_ms`: delay before the first retry
/// - `max_attempts`: number of retries after the initial attempt
///   (`0` means exactly one attempt)
/// - `exponent`: multiplier applied to the delay for each further retry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRetryConfig", into = "RawRetryConfig")]
pub struct RetryConfig {
    initial_delay_ms: u64,
    max_attempts: u32,
    exponent: f64,
}

impl RetryConfig {
    /// Hard-coded global default: a single attempt, no retries
    pub const NO_RETRY: RetryConfig = RetryConfig {
        initial_delay_ms: 0,
        max_attempts: 0,
        exponent: 1.0,
    };

    /// Build a validated configuration
    ///
    /// # Example
    /// ```
    /// use pgpw_core_resilience::RetryConfig;
    ///
    /// let config = RetryConfig::new(100, 3, 2.0).unwrap();
    /// assert_eq!(config.max_attempts(), 3);
    ///
    /// assert!(RetryConfig::new(100, 3, 0.0).is_err());
    /// ```
    pub fn new(
        initial_delay_ms: u64,
        max_attempts: u32,
        exponent: f64,
    ) -> Result<Self, InvalidRetryConfig> {
        if !exponent.is_finite() || exponent <= 0.0 {
            return Err(InvalidRetryConfig(
                "\"retry.exponent\" value must be a positive number".to_string(),
            ));
        }

        Ok(Self {
            initial_delay_ms,
            max_attempts,
            exponent,
        })
    }

    /// Delay before the first retry, in milliseconds
    pub fn initial_delay_ms(&self) -> u64 {
        self.initial_delay_ms
    }

    /// Retry budget after the initial attempt
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff multiplier
    pub fn exponent(&self) -> f64 {
        self.exponent
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::NO_RETRY
    }
}

/// Wire shape used for (de)serialization; signed so that negative input
/// is reported as a validation failure instead of a type mismatch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRetryConfig {
    initial_delay_ms: i64,
    max_attempts: i64,
    exponent: f64,
}

impl TryFrom<RawRetryConfig> for RetryConfig {
    type Error = InvalidRetryConfig;

    fn try_from(raw: RawRetryConfig) -> Result<Self, Self::Error> {
        let initial_delay_ms = u64::try_from(raw.initial_delay_ms).map_err(|_| {
            InvalidRetryConfig(
                "\"retry.initial_delay_ms\" value must be a non-negative integer".to_string(),
            )
        })?;
        let max_attempts = u32::try_from(raw.max_attempts).map_err(|_| {
            InvalidRetryConfig(
                "\"retry.max_attempts\" value must be a non-negative integer".to_string(),
            )
        })?;

        RetryConfig::new(initial_delay_ms, max_attempts, raw.exponent)
    }
}

impl From<RetryConfig> for RawRetryConfig {
    fn from(config: RetryConfig) -> Self {
        Self {
            initial_delay_ms: i64::try_from(config.initial_delay_ms).unwrap_or(i64::MAX),
            max_attempts: i64::from(config.max_attempts),
            exponent: config.exponent,
        }
    }
}

/// Per-call retry choice
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RetryOverride {
    /// Nothing supplied: fall back to the handle default, then the global one
    #[default]
    Inherit,
    /// Explicit opt-out: use the global default and ignore the handle's own
    UseGlobalDefault,
    /// Use this configuration for the call
    Custom(RetryConfig),
}

impl RetryOverride {
    /// Validated custom override
    pub fn custom(
        initial_delay_ms: u64,
        max_attempts: u32,
        exponent: f64,
    ) -> Result<Self, InvalidRetryConfig> {
        RetryConfig::new(initial_delay_ms, max_attempts, exponent).map(RetryOverride::Custom)
    }
}

impl From<RetryConfig> for RetryOverride {
    fn from(config: RetryConfig) -> Self {
        RetryOverride::Custom(config)
    }
}

/// Pick the effective configuration for one call
///
/// Precedence, highest first: custom override, explicit opt-out to the
/// global default, handle default, global default.
pub fn resolve(
    per_call: &RetryOverride,
    handle_default: Option<&RetryConfig>,
    global_default: &RetryConfig,
) -> RetryConfig {
    match per_call {
        RetryOverride::Custom(config) => *config,
        RetryOverride::UseGlobalDefault => *global_default,
        RetryOverride::Inherit => handle_default.copied().unwrap_or(*global_default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentinel(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(10, max_attempts, 1.5).unwrap()
    }

    #[test]
    fn test_global_default_is_single_attempt() {
        let config = RetryConfig::default();
        assert_eq!(config, RetryConfig::NO_RETRY);
        assert_eq!(config.initial_delay_ms(), 0);
        assert_eq!(config.max_attempts(), 0);
        assert_eq!(config.exponent(), 1.0);
    }

    #[test]
    fn test_exponent_must_be_positive_and_finite() {
        for exponent in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = RetryConfig::new(0, 0, exponent).unwrap_err();
            assert_eq!(
                err.to_string(),
                "\"retry.exponent\" value must be a positive number"
            );
        }
        assert!(RetryConfig::new(0, 0, 0.5).is_ok());
    }

    #[test]
    fn test_deserialize_valid() {
        let config: RetryConfig = serde_json::from_str(
            r#"{"initial_delay_ms": 250, "max_attempts": 4, "exponent": 2}"#,
        )
        .unwrap();
        assert_eq!(config, RetryConfig::new(250, 4, 2.0).unwrap());
    }

    #[test]
    fn test_deserialize_rejects_negative_fields() {
        let err = serde_json::from_str::<RetryConfig>(
            r#"{"initial_delay_ms": -1, "max_attempts": 4, "exponent": 2}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("initial_delay_ms"));

        let err = serde_json::from_str::<RetryConfig>(
            r#"{"initial_delay_ms": 1, "max_attempts": -4, "exponent": 2}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_attempts"));

        let err = serde_json::from_str::<RetryConfig>(
            r#"{"initial_delay_ms": 1, "max_attempts": 4, "exponent": 0}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exponent"));
    }

    #[test]
    fn test_deserialize_rejects_missing_and_fractional_fields() {
        assert!(
            serde_json::from_str::<RetryConfig>(r#"{"initial_delay_ms": 1, "exponent": 2}"#)
                .is_err()
        );
        assert!(serde_json::from_str::<RetryConfig>(
            r#"{"initial_delay_ms": 1.5, "max_attempts": 1, "exponent": 2}"#
        )
        .is_err());
    }

    #[test]
    fn test_serialize_uses_field_names() {
        let json = serde_json::to_value(RetryConfig::new(5, 2, 3.0).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"initial_delay_ms": 5, "max_attempts": 2, "exponent": 3.0})
        );
    }

    #[test]
    fn test_resolve_custom_wins() {
        let custom = sentinel(1);
        let handle = sentinel(2);
        let global = sentinel(3);

        let resolved = resolve(&RetryOverride::Custom(custom), Some(&handle), &global);
        assert_eq!(resolved, custom);
    }

    #[test]
    fn test_resolve_opt_out_skips_handle_default() {
        let handle = sentinel(2);
        let global = sentinel(3);

        let resolved = resolve(&RetryOverride::UseGlobalDefault, Some(&handle), &global);
        assert_eq!(resolved, global);
    }

    #[test]
    fn test_resolve_inherit_uses_handle_default() {
        let handle = sentinel(2);
        let global = sentinel(3);

        let resolved = resolve(&RetryOverride::Inherit, Some(&handle), &global);
        assert_eq!(resolved, handle);
    }

    #[test]
    fn test_resolve_inherit_without_handle_default() {
        let global = sentinel(3);

        let resolved = resolve(&RetryOverride::Inherit, None, &global);
        assert_eq!(resolved, global);
    }

    #[test]
    fn test_custom_override_is_validated() {
        assert!(RetryOverride::custom(0, 0, -2.0).is_err());
        assert_eq!(
            RetryOverride::custom(1, 2, 3.0).unwrap(),
            RetryOverride::Custom(RetryConfig::new(1, 2, 3.0).unwrap())
        );
    }
}

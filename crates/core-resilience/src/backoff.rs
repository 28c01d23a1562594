//! Exponential backoff delay calculation

use crate::policy::RetryConfig;
use std::time::Duration;

/// Delay in milliseconds to wait before attempt `attempt`
///
/// Attempt `0` is the initial try and never waits. For `n >= 1` the delay is
/// `floor(initial_delay_ms * exponent^(n - 1))`, so the first retry waits
/// exactly `initial_delay_ms`.
///
/// ```
/// use pgpw_core_resilience::{backoff, RetryConfig};
///
/// let config = RetryConfig::new(100, 5, 2.0).unwrap();
/// assert_eq!(backoff::delay_ms(&config, 0), 0);
/// assert_eq!(backoff::delay_ms(&config, 1), 100);
/// assert_eq!(backoff::delay_ms(&config, 3), 400);
/// ```
pub fn delay_ms(config: &RetryConfig, attempt: u32) -> u64 {
    if attempt == 0 {
        return 0;
    }

    let factor = config.exponent().powf(f64::from(attempt - 1));
    // Saturating cast: huge products clamp to u64::MAX
    (config.initial_delay_ms() as f64 * factor).floor() as u64
}

/// [`delay_ms`] as a [`Duration`]
pub fn delay(config: &RetryConfig, attempt: u32) -> Duration {
    Duration::from_millis(delay_ms(config, attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(initial_delay_ms: u64, exponent: f64) -> RetryConfig {
        RetryConfig::new(initial_delay_ms, 10, exponent).unwrap()
    }

    #[test]
    fn test_first_attempt_never_waits() {
        for (initial, exponent) in [(0, 1.0), (100, 2.0), (u64::MAX, 10.0), (7, 0.1)] {
            assert_eq!(delay_ms(&config(initial, exponent), 0), 0);
        }
    }

    #[test]
    fn test_first_retry_waits_initial_delay() {
        assert_eq!(delay_ms(&config(250, 3.0), 1), 250);
        assert_eq!(delay_ms(&config(250, 0.5), 1), 250);
    }

    #[test]
    fn test_exponential_growth() {
        let config = config(100, 2.0);
        let delays: Vec<u64> = (1..=5).map(|n| delay_ms(&config, n)).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1600]);
    }

    #[test]
    fn test_fractional_exponent_is_floored() {
        let config = config(100, 1.5);
        // 100, 150, 225, 337.5, 506.25
        let delays: Vec<u64> = (1..=5).map(|n| delay_ms(&config, n)).collect();
        assert_eq!(delays, vec![100, 150, 225, 337, 506]);
    }

    #[test]
    fn test_shrinking_exponent() {
        let config = config(1000, 0.5);
        assert_eq!(delay_ms(&config, 2), 500);
        assert_eq!(delay_ms(&config, 3), 250);
        assert_eq!(delay_ms(&config, 12), 0);
    }

    #[test]
    fn test_zero_initial_delay_stays_zero() {
        let config = config(0, 5.0);
        assert!((0..20).all(|n| delay_ms(&config, n) == 0));
    }

    #[test]
    fn test_overflow_saturates() {
        let config = config(u64::MAX, 10.0);
        assert_eq!(delay_ms(&config, 40), u64::MAX);
    }

    #[test]
    fn test_same_input_same_output() {
        let config = config(123, 1.7);
        assert_eq!(delay_ms(&config, 6), delay_ms(&config, 6));
        assert_eq!(delay(&config, 6), Duration::from_millis(delay_ms(&config, 6)));
    }
}

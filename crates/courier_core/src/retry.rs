//! Retry policy and backoff calculation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff settings for one logical call.
///
/// A policy is an immutable snapshot: it is chosen when a request is
/// submitted and never changes for the lifetime of that request.
///
/// # Examples
///
/// ```
/// use courier_core::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(*policy.max_attempts(), 3);
/// assert_eq!(policy.delay(1), Duration::from_secs(1));
/// assert_eq!(policy.delay(2), Duration::from_secs(2));
///
/// let patient = RetryPolicy::builder().max_attempts(6).max_delay_ms(5_000).build();
/// assert_eq!(patient.delay(5), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first (default 3).
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,

    /// Delay before the second attempt, in milliseconds (default 1000).
    #[serde(default = "default_base_delay_ms")]
    base_delay_ms: u64,

    /// Upper bound on any single delay, in milliseconds (default 30000).
    #[serde(default = "default_max_delay_ms")]
    max_delay_ms: u64,

    /// Growth factor between consecutive delays (default 2.0).
    #[serde(default = "default_backoff_multiplier")]
    backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy builder.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Delay before the second attempt.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Upper bound on any single delay.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Backoff to wait after `attempt` (1-based) has failed.
    ///
    /// Computes `min(base * multiplier^(attempt - 1), max)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        // NaN (0 * inf) falls through to the cap as well.
        let capped = millis.min(self.max_delay_ms as f64);
        Duration::from_millis(capped.round() as u64)
    }

    /// Whether a failure of `attempt` may be followed by another try.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns an error if no attempt is allowed, the base delay exceeds the
    /// cap, or the multiplier is below 1.0 or not finite.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(format!(
                "base_delay_ms ({}) must not exceed max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "backoff_multiplier must be finite and >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        Ok(())
    }
}

/// Builder for `RetryPolicy`.
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    backoff_multiplier: Option<f64>,
}

impl RetryPolicyBuilder {
    /// Sets the total number of attempts.
    pub fn max_attempts(mut self, value: u32) -> Self {
        self.max_attempts = Some(value);
        self
    }

    /// Sets the base delay in milliseconds.
    pub fn base_delay_ms(mut self, value: u64) -> Self {
        self.base_delay_ms = Some(value);
        self
    }

    /// Sets the delay cap in milliseconds.
    pub fn max_delay_ms(mut self, value: u64) -> Self {
        self.max_delay_ms = Some(value);
        self
    }

    /// Sets the backoff multiplier.
    pub fn backoff_multiplier(mut self, value: f64) -> Self {
        self.backoff_multiplier = Some(value);
        self
    }

    /// Builds the `RetryPolicy`.
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or_else(default_max_attempts),
            base_delay_ms: self.base_delay_ms.unwrap_or_else(default_base_delay_ms),
            max_delay_ms: self.max_delay_ms.unwrap_or_else(default_max_delay_ms),
            backoff_multiplier: self
                .backoff_multiplier
                .unwrap_or_else(default_backoff_multiplier),
        }
    }
}

//! Per-provider rate limit policy.

use serde::{Deserialize, Serialize};

/// Request budget for one provider.
///
/// Both ceilings count requests recorded in the trailing 60-second window.
/// The tighter of the two decides admission.
///
/// # Examples
///
/// ```
/// use courier_core::RateLimitPolicy;
///
/// let policy = RateLimitPolicy::default();
/// assert_eq!(*policy.requests_per_minute(), 60);
/// assert_eq!(*policy.burst(), 10);
/// assert_eq!(policy.effective_limit(), 10);
///
/// let strict = RateLimitPolicy::builder().requests_per_minute(5).build();
/// assert_eq!(strict.effective_limit(), 5);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters,
)]
#[serde(deny_unknown_fields)]
pub struct RateLimitPolicy {
    /// Requests-per-minute ceiling (default 60).
    #[serde(default = "default_requests_per_minute")]
    requests_per_minute: u32,

    /// Maximum requests counted in the window at any moment (default 10).
    #[serde(default = "default_burst")]
    burst: u32,
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_burst() -> u32 {
    10
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            burst: default_burst(),
        }
    }
}

impl RateLimitPolicy {
    /// Creates a new rate limit policy builder.
    pub fn builder() -> RateLimitPolicyBuilder {
        RateLimitPolicyBuilder::default()
    }

    /// Number of window entries at which admission is denied.
    pub fn effective_limit(&self) -> u32 {
        self.requests_per_minute.min(self.burst)
    }

    /// Validates that both ceilings admit at least one request.
    ///
    /// # Errors
    ///
    /// Returns an error if either ceiling is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.requests_per_minute == 0 {
            return Err("requests_per_minute must be at least 1".to_string());
        }
        if self.burst == 0 {
            return Err("burst must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Builder for `RateLimitPolicy`.
#[derive(Debug, Default)]
pub struct RateLimitPolicyBuilder {
    requests_per_minute: Option<u32>,
    burst: Option<u32>,
}

impl RateLimitPolicyBuilder {
    /// Sets the requests-per-minute ceiling.
    pub fn requests_per_minute(mut self, value: u32) -> Self {
        self.requests_per_minute = Some(value);
        self
    }

    /// Sets the burst ceiling.
    pub fn burst(mut self, value: u32) -> Self {
        self.burst = Some(value);
        self
    }

    /// Builds the `RateLimitPolicy`.
    pub fn build(self) -> RateLimitPolicy {
        RateLimitPolicy {
            requests_per_minute: self
                .requests_per_minute
                .unwrap_or_else(default_requests_per_minute),
            burst: self.burst.unwrap_or_else(default_burst),
        }
    }
}

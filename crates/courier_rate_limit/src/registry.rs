//! Rate limit state and policy for every known provider.

use crate::{MAX_THROTTLE, RateLimitState};
use chrono::{DateTime, Utc};
use courier_core::RateLimitPolicy;
use courier_error::{ConfigError, CourierResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Point-in-time view of one provider's rate limit state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSnapshot {
    /// Provider identifier
    pub provider_id: String,
    /// Requests recorded inside the sliding window
    pub recent_request_count: usize,
    /// Whether a provider-signalled throttle is in force
    pub is_throttled: bool,
    /// Wall-clock time of the most recent admission
    pub last_request_time: Option<DateTime<Utc>>,
}

/// Per-provider rate limit states and policy overrides.
///
/// States are created lazily on first use and live for the lifetime of the
/// registry. Providers without an override use the default policy.
///
/// # Example
///
/// ```rust
/// use courier_core::RateLimitPolicy;
/// use courier_rate_limit::RateLimitRegistry;
/// use tokio::time::Instant;
///
/// let mut registry = RateLimitRegistry::new(RateLimitPolicy::builder().burst(1).build());
/// let now = Instant::now();
/// assert!(registry.try_admit("openai", now));
/// assert!(!registry.try_admit("openai", now));
/// assert!(registry.try_admit("anthropic", now));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RateLimitRegistry {
    default_policy: RateLimitPolicy,
    policies: HashMap<String, RateLimitPolicy>,
    states: HashMap<String, RateLimitState>,
}

impl RateLimitRegistry {
    /// Create a registry whose providers all start on `default_policy`.
    pub fn new(default_policy: RateLimitPolicy) -> Self {
        Self {
            default_policy,
            policies: HashMap::new(),
            states: HashMap::new(),
        }
    }

    /// Replace the policy for one provider.
    ///
    /// Already recorded timestamps are kept and counted against the new policy.
    ///
    /// # Errors
    ///
    /// Returns a configuration error, and keeps the current policy, if
    /// `policy` fails validation.
    pub fn configure(&mut self, provider_id: &str, policy: RateLimitPolicy) -> CourierResult<()> {
        policy
            .validate()
            .map_err(|e| ConfigError::new(format!("[providers.{}] {}", provider_id, e)))?;
        info!(
            provider = provider_id,
            requests_per_minute = *policy.requests_per_minute(),
            burst = *policy.burst(),
            "Configured rate limit"
        );
        self.policies.insert(provider_id.to_string(), policy);
        Ok(())
    }

    /// Policy in force for a provider.
    pub fn policy_for(&self, provider_id: &str) -> RateLimitPolicy {
        self.policies
            .get(provider_id)
            .copied()
            .unwrap_or(self.default_policy)
    }

    /// Admission check without recording.
    ///
    /// A provider with no state yet is always admissible.
    pub fn can_admit(&mut self, provider_id: &str, now: Instant) -> bool {
        let policy = self.policy_for(provider_id);
        match self.states.get_mut(provider_id) {
            Some(state) => {
                let was_throttled = state.throttle_end().is_some();
                let admissible = state.can_admit(&policy, now);
                if was_throttled && state.throttle_end().is_none() {
                    info!(provider = provider_id, "Throttle cleared");
                }
                admissible
            }
            None => true,
        }
    }

    /// Record an admission, creating the provider's state if needed.
    pub fn record_admission(&mut self, provider_id: &str, now: Instant) {
        self.states
            .entry(provider_id.to_string())
            .or_default()
            .record_admission(now);
    }

    /// Check and record in one step.
    pub fn try_admit(&mut self, provider_id: &str, now: Instant) -> bool {
        if !self.can_admit(provider_id, now) {
            debug!(provider = provider_id, "Admission denied");
            return false;
        }
        self.record_admission(provider_id, now);
        true
    }

    /// Throttle a provider for `duration` starting at `now`.
    pub fn apply_throttle(&mut self, provider_id: &str, duration: Duration, now: Instant) {
        info!(
            provider = provider_id,
            throttle_ms = duration.min(MAX_THROTTLE).as_millis() as u64,
            "Provider throttled"
        );
        self.states
            .entry(provider_id.to_string())
            .or_default()
            .apply_throttle(now, duration);
    }

    /// Earliest instant a request to this provider could be admitted.
    pub fn ready_at(&self, provider_id: &str, now: Instant) -> Option<Instant> {
        let policy = self.policy_for(provider_id);
        match self.states.get(provider_id) {
            Some(state) => state.ready_at(&policy, now),
            None if policy.effective_limit() > 0 => Some(now),
            None => None,
        }
    }

    /// State for a provider, if any request was ever recorded or throttled.
    pub fn state(&self, provider_id: &str) -> Option<&RateLimitState> {
        self.states.get(provider_id)
    }

    /// Snapshot of every provider with recorded state, sorted by id.
    pub fn snapshot(&self, now: Instant) -> Vec<ProviderSnapshot> {
        let mut snapshots: Vec<ProviderSnapshot> = self
            .states
            .iter()
            .map(|(provider_id, state)| ProviderSnapshot {
                provider_id: provider_id.clone(),
                recent_request_count: state.recent_request_count(now),
                is_throttled: state.is_throttled(now),
                last_request_time: state.last_request_time(),
            })
            .collect();
        snapshots.sort_by(|a, b| a.provider_id.cmp(&b.provider_id));
        snapshots
    }
}

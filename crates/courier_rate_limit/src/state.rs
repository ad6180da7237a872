//! Sliding-window request log and throttle timer for one provider.

use chrono::{DateTime, Utc};
use courier_core::RateLimitPolicy;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Length of the sliding window. Entries this old or older are expired.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Longest throttle honoured. Longer provider hints are clamped to this.
pub const MAX_THROTTLE: Duration = Duration::from_secs(24 * 60 * 60);

/// Request history and throttle status for one provider.
///
/// Timestamps use `tokio::time::Instant`, so a paused tokio clock drives the
/// window in tests.
#[derive(Debug, Clone, Default)]
pub struct RateLimitState {
    timestamps: VecDeque<Instant>,
    last_request: Option<Instant>,
    last_request_time: Option<DateTime<Utc>>,
    throttled: bool,
    throttle_end: Option<Instant>,
}

impl RateLimitState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether one more request may proceed at `now`.
    ///
    /// Clears an elapsed throttle and prunes expired timestamps as a side
    /// effect. Does not record anything; see [`Self::try_admit`].
    pub fn can_admit(&mut self, policy: &RateLimitPolicy, now: Instant) -> bool {
        if self.throttled {
            match self.throttle_end {
                Some(end) if now < end => return false,
                _ => self.clear_throttle(),
            }
        }

        self.prune(now);
        let count = self.timestamps.len();
        if count >= *policy.burst() as usize {
            return false;
        }
        count < *policy.requests_per_minute() as usize
    }

    /// Append `now` to the window and update the last-request time.
    pub fn record_admission(&mut self, now: Instant) {
        self.timestamps.push_back(now);
        self.prune(now);
        self.last_request = Some(now);
        self.last_request_time = Some(Utc::now());
    }

    /// Check and record in one step.
    ///
    /// Returns `true` if the request was admitted and recorded.
    pub fn try_admit(&mut self, policy: &RateLimitPolicy, now: Instant) -> bool {
        if !self.can_admit(policy, now) {
            return false;
        }
        self.record_admission(now);
        true
    }

    /// Hold back every request until `now + duration`.
    ///
    /// `duration` is clamped to [`MAX_THROTTLE`]. A later throttle replaces an
    /// earlier one, even if it ends sooner.
    pub fn apply_throttle(&mut self, now: Instant, duration: Duration) {
        let duration = duration.min(MAX_THROTTLE);
        self.throttled = true;
        self.throttle_end = Some(now.checked_add(duration).unwrap_or(now));
    }

    fn clear_throttle(&mut self) {
        self.throttled = false;
        self.throttle_end = None;
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.duration_since(oldest) >= WINDOW {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Whether a throttle is in force at `now`.
    pub fn is_throttled(&self, now: Instant) -> bool {
        self.throttled && self.throttle_end.is_some_and(|end| now < end)
    }

    /// When the current throttle ends, if one was applied and not yet cleared.
    pub fn throttle_end(&self) -> Option<Instant> {
        self.throttle_end
    }

    /// Number of recorded requests still inside the window at `now`.
    pub fn recent_request_count(&self, now: Instant) -> usize {
        self.timestamps
            .iter()
            .filter(|&&t| now.duration_since(t) < WINDOW)
            .count()
    }

    /// Monotonic instant of the most recent admission.
    pub fn last_request(&self) -> Option<Instant> {
        self.last_request
    }

    /// Wall-clock time of the most recent admission.
    pub fn last_request_time(&self) -> Option<DateTime<Utc>> {
        self.last_request_time
    }

    /// Earliest instant at which [`Self::can_admit`] could return `true`.
    ///
    /// Returns `now` if a request is admissible already, and `None` if the
    /// policy can never admit anything.
    pub fn ready_at(&self, policy: &RateLimitPolicy, now: Instant) -> Option<Instant> {
        if self.is_throttled(now) {
            return self.throttle_end;
        }

        let limit = policy.effective_limit() as usize;
        if limit == 0 {
            return None;
        }

        let live: Vec<Instant> = self
            .timestamps
            .iter()
            .copied()
            .filter(|&t| now.duration_since(t) < WINDOW)
            .collect();
        if live.len() < limit {
            return Some(now);
        }
        // Admissible once enough of the oldest entries have aged out.
        Some(live[live.len() - limit] + WINDOW)
    }
}

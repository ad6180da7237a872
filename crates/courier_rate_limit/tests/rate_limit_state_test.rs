//! Tests for sliding-window admission and throttling.

use courier_core::RateLimitPolicy;
use courier_rate_limit::{MAX_THROTTLE, RateLimitRegistry, RateLimitState, WINDOW};
use std::time::Duration;
use tokio::time::Instant;

fn policy(requests_per_minute: u32, burst: u32) -> RateLimitPolicy {
    RateLimitPolicy::builder()
        .requests_per_minute(requests_per_minute)
        .burst(burst)
        .build()
}

#[test]
fn test_burst_ceiling_denies_extra_request() {
    let policy = policy(60, 3);
    let mut state = RateLimitState::new();
    let now = Instant::now();

    assert!(state.try_admit(&policy, now));
    assert!(state.try_admit(&policy, now));
    assert!(state.try_admit(&policy, now));
    assert!(!state.try_admit(&policy, now), "Fourth request exceeds burst");
    assert_eq!(state.recent_request_count(now), 3);
}

#[test]
fn test_requests_per_minute_ceiling() {
    let policy = policy(2, 10);
    let mut state = RateLimitState::new();
    let now = Instant::now();

    assert!(state.try_admit(&policy, now));
    assert!(state.try_admit(&policy, now + Duration::from_secs(10)));
    assert!(!state.try_admit(&policy, now + Duration::from_secs(20)));
}

#[test]
fn test_denied_check_records_nothing() {
    let policy = policy(60, 1);
    let mut state = RateLimitState::new();
    let now = Instant::now();

    assert!(state.try_admit(&policy, now));
    assert!(!state.can_admit(&policy, now));
    assert!(!state.can_admit(&policy, now));
    assert_eq!(state.recent_request_count(now), 1);
}

#[test]
fn test_window_decay_readmits() {
    let policy = policy(60, 2);
    let mut state = RateLimitState::new();
    let start = Instant::now();

    assert!(state.try_admit(&policy, start));
    assert!(state.try_admit(&policy, start + Duration::from_secs(30)));
    assert!(!state.can_admit(&policy, start + Duration::from_secs(59)));

    // The first entry expires exactly one window after it was recorded.
    assert!(state.can_admit(&policy, start + WINDOW));
    assert_eq!(state.recent_request_count(start + WINDOW), 1);
}

#[test]
fn test_throttle_blocks_until_end() {
    let policy = policy(60, 10);
    let mut state = RateLimitState::new();
    let now = Instant::now();

    state.apply_throttle(now, Duration::from_secs(5));
    assert!(state.is_throttled(now));
    assert!(!state.can_admit(&policy, now + Duration::from_secs(4)));

    let after = now + Duration::from_secs(5);
    assert!(!state.is_throttled(after));
    assert!(state.can_admit(&policy, after));
    assert_eq!(state.throttle_end(), None, "Elapsed throttle is cleared lazily");
}

#[test]
fn test_record_updates_last_request() {
    let mut state = RateLimitState::new();
    assert!(state.last_request().is_none());
    assert!(state.last_request_time().is_none());

    let now = Instant::now();
    state.record_admission(now);
    assert_eq!(state.last_request(), Some(now));
    assert!(state.last_request_time().is_some());
}

#[test]
fn test_ready_at_for_full_window() {
    let policy = policy(60, 2);
    let mut state = RateLimitState::new();
    let start = Instant::now();

    assert!(state.try_admit(&policy, start));
    assert!(state.try_admit(&policy, start + Duration::from_secs(10)));

    let now = start + Duration::from_secs(20);
    assert_eq!(state.ready_at(&policy, now), Some(start + WINDOW));
}

#[test]
fn test_ready_at_prefers_throttle_end() {
    let policy = policy(60, 10);
    let mut state = RateLimitState::new();
    let now = Instant::now();

    assert_eq!(state.ready_at(&policy, now), Some(now));
    state.apply_throttle(now, Duration::from_secs(8));
    assert_eq!(
        state.ready_at(&policy, now),
        Some(now + Duration::from_secs(8))
    );
}

#[test]
fn test_registry_keeps_providers_independent() {
    let mut registry = RateLimitRegistry::new(policy(60, 1));
    let now = Instant::now();

    assert!(registry.try_admit("openai", now));
    assert!(!registry.try_admit("openai", now));
    assert!(registry.try_admit("gemini", now));

    registry.apply_throttle("gemini", Duration::from_secs(30), now);
    let snapshot = registry.snapshot(now);
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].provider_id, "gemini");
    assert!(snapshot[0].is_throttled);
    assert_eq!(snapshot[1].provider_id, "openai");
    assert!(!snapshot[1].is_throttled);
    assert_eq!(snapshot[1].recent_request_count, 1);
}

#[test]
fn test_registry_configure_keeps_history() {
    let mut registry = RateLimitRegistry::new(policy(60, 2));
    let now = Instant::now();

    assert!(registry.try_admit("openai", now));
    assert!(registry.try_admit("openai", now));
    assert!(!registry.can_admit("openai", now));

    registry.configure("openai", policy(60, 3)).unwrap();
    assert_eq!(*registry.policy_for("openai").burst(), 3);
    assert!(registry.try_admit("openai", now));
    assert!(!registry.try_admit("openai", now));
    assert_eq!(*registry.policy_for("anthropic").burst(), 2);
}

#[test]
fn test_registry_unknown_provider_is_admissible() {
    let mut registry = RateLimitRegistry::default();
    let now = Instant::now();

    assert!(registry.can_admit("never-seen", now));
    assert!(registry.state("never-seen").is_none());
    assert_eq!(registry.ready_at("never-seen", now), Some(now));
    assert!(registry.snapshot(now).is_empty());
}

#[test]
fn test_registry_rejects_invalid_policy_and_keeps_current() {
    let mut registry = RateLimitRegistry::new(policy(60, 2));
    registry.configure("openai", policy(60, 4)).unwrap();

    let err = registry.configure("openai", policy(60, 0)).unwrap_err();
    assert!(err.to_string().contains("providers.openai"));
    assert!(registry.configure("openai", policy(0, 4)).is_err());
    assert_eq!(*registry.policy_for("openai").burst(), 4);
    assert_eq!(*registry.policy_for("openai").requests_per_minute(), 60);
}

#[test]
fn test_oversized_throttle_is_clamped() {
    let mut state = RateLimitState::new();
    let now = Instant::now();

    state.apply_throttle(now, Duration::MAX);
    assert!(state.is_throttled(now));
    assert_eq!(state.throttle_end(), Some(now + MAX_THROTTLE));
    assert!(!state.is_throttled(now + MAX_THROTTLE));
}

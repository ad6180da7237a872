use courier_core::{RateLimitPolicy, RequestId, RetryPolicy};
use std::time::Duration;

#[test]
fn default_retry_policy_doubles_from_one_second() {
    let policy = RetryPolicy::default();
    assert_eq!(*policy.max_attempts(), 3);
    assert_eq!(policy.base_delay(), Duration::from_secs(1));
    assert_eq!(policy.max_delay(), Duration::from_secs(30));
    assert_eq!(*policy.backoff_multiplier(), 2.0);

    assert_eq!(policy.delay(1), Duration::from_secs(1));
    assert_eq!(policy.delay(2), Duration::from_secs(2));
    assert_eq!(policy.delay(3), Duration::from_secs(4));
    assert_eq!(policy.delay(5), Duration::from_secs(16));
}

#[test]
fn delay_is_capped_at_max() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay(6), Duration::from_secs(30));
    assert_eq!(policy.delay(60), Duration::from_secs(30));
    assert_eq!(policy.delay(u32::MAX), Duration::from_secs(30));
}

#[test]
fn delay_for_attempt_zero_uses_base() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay(0), Duration::from_secs(1));
}

#[test]
fn fractional_multiplier() {
    let policy = RetryPolicy::builder()
        .base_delay_ms(100)
        .backoff_multiplier(1.5)
        .build();
    assert_eq!(policy.delay(1), Duration::from_millis(100));
    assert_eq!(policy.delay(2), Duration::from_millis(150));
    assert_eq!(policy.delay(3), Duration::from_millis(225));
}

#[test]
fn retry_allowed_until_max_attempts() {
    let policy = RetryPolicy::builder().max_attempts(2).build();
    assert!(policy.allows_retry_after(1));
    assert!(!policy.allows_retry_after(2));
    assert!(!policy.allows_retry_after(3));
}

#[test]
fn validate_rejects_invalid_retry_policies() {
    assert!(RetryPolicy::builder().max_attempts(0).build().validate().is_err());
    assert!(
        RetryPolicy::builder()
            .base_delay_ms(5_000)
            .max_delay_ms(1_000)
            .build()
            .validate()
            .is_err()
    );
    assert!(
        RetryPolicy::builder()
            .backoff_multiplier(0.5)
            .build()
            .validate()
            .is_err()
    );
    assert!(
        RetryPolicy::builder()
            .backoff_multiplier(f64::NAN)
            .build()
            .validate()
            .is_err()
    );
    assert!(RetryPolicy::default().validate().is_ok());
}

#[test]
fn retry_policy_partial_json_uses_defaults() {
    let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
    assert_eq!(*policy.max_attempts(), 5);
    assert_eq!(*policy.base_delay_ms(), 1_000);
    assert_eq!(*policy.max_delay_ms(), 30_000);
}

#[test]
fn rate_limit_policy_defaults() {
    let policy = RateLimitPolicy::default();
    assert_eq!(*policy.requests_per_minute(), 60);
    assert_eq!(*policy.burst(), 10);
    assert!(policy.validate().is_ok());
}

#[test]
fn rate_limit_policy_effective_limit_is_tighter_ceiling() {
    let policy = RateLimitPolicy::builder()
        .requests_per_minute(4)
        .burst(8)
        .build();
    assert_eq!(policy.effective_limit(), 4);
}

#[test]
fn rate_limit_policy_rejects_zero_ceilings() {
    assert!(RateLimitPolicy::builder().burst(0).build().validate().is_err());
    assert!(
        RateLimitPolicy::builder()
            .requests_per_minute(0)
            .build()
            .validate()
            .is_err()
    );
}

#[test]
fn rate_limit_policy_rejects_unknown_fields() {
    let parsed: Result<RateLimitPolicy, _> = serde_json::from_str(r#"{"rpm": 5}"#);
    assert!(parsed.is_err());
}

#[test]
fn request_ids_are_unique() {
    let a = RequestId::new();
    let b = RequestId::new();
    assert_ne!(a, b);
    assert_eq!(a.to_string(), a.as_uuid().to_string());
}

//! End-to-end use of the re-exported API.

use async_trait::async_trait;
use courier::{
    DispatchConfig, Dispatcher, Provider, ProviderError, ProviderErrorKind, ProviderResult,
    RateLimitPolicy, RetryPolicy, RetryableError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Answers with the prompt reversed after failing a fixed number of times.
struct Flaky {
    failures_left: AtomicU32,
}

#[async_trait]
impl Provider for Flaky {
    fn provider_id(&self) -> &str {
        "flaky"
    }

    async fn send(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        model: Option<&str>,
    ) -> ProviderResult<String> {
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::new(
                "flaky",
                ProviderErrorKind::from_status(503, None),
            ));
        }

        let reversed: String = prompt.chars().rev().collect();
        Ok(format!(
            "{}|{}|{}",
            system_prompt.unwrap_or("-"),
            model.unwrap_or("-"),
            reversed
        ))
    }
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_through_facade() {
    let dispatcher = Dispatcher::new(DispatchConfig::load().unwrap());
    dispatcher
        .configure_rate_limit("flaky", RateLimitPolicy::builder().burst(2).build())
        .unwrap();

    let provider = Arc::new(Flaky {
        failures_left: AtomicU32::new(1),
    });
    let reply = dispatcher
        .send_request(
            provider,
            "abc",
            Some("terse".to_string()),
            Some("model-x".to_string()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(reply, "terse|model-x|cba");

    let stats = dispatcher.get_statistics();
    assert_eq!(stats.provider("flaky").unwrap().recent_request_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_surface_last_error() {
    let dispatcher = Dispatcher::default();
    let provider = Arc::new(Flaky {
        failures_left: AtomicU32::new(10),
    });
    let retry = RetryPolicy::builder()
        .max_attempts(2)
        .base_delay_ms(500)
        .build();

    let start = tokio::time::Instant::now();
    let err = dispatcher
        .send_request(provider, "abc", None, None, Some(retry))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), &ProviderErrorKind::ServiceUnavailable);
    assert!(RetryableError::is_retryable(&err));
    assert_eq!(start.elapsed(), Duration::from_millis(500));
}

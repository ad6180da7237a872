//! One logical call to a provider.

use courier_core::{RequestId, RetryPolicy};
use courier_error::ProviderResult;
use courier_interface::Provider;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A prompt bound for one provider, plus its retry bookkeeping.
///
/// The id, start time and retry policy are fixed when the request is
/// created. Each retry derives a new value with the attempt counter bumped.
#[derive(Clone)]
pub struct Request {
    id: RequestId,
    provider: Arc<dyn Provider>,
    provider_id: String,
    prompt: String,
    system_prompt: Option<String>,
    model: Option<String>,
    started_at: Instant,
    attempt: u32,
    retry_policy: RetryPolicy,
}

impl Request {
    /// Create the first attempt of a new logical call.
    pub fn new(
        provider: Arc<dyn Provider>,
        prompt: impl Into<String>,
        system_prompt: Option<String>,
        model: Option<String>,
        retry_policy: RetryPolicy,
    ) -> Self {
        let provider_id = provider.provider_id().to_string();
        Self {
            id: RequestId::new(),
            provider,
            provider_id,
            prompt: prompt.into(),
            system_prompt,
            model,
            started_at: Instant::now(),
            attempt: 1,
            retry_policy,
        }
    }

    /// The same call, one attempt later.
    pub fn next_attempt(self) -> Self {
        Self {
            attempt: self.attempt.saturating_add(1),
            ..self
        }
    }

    /// Identity shared by every attempt of this call.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Identifier of the target provider.
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Prompt text.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Optional system prompt.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Optional model identifier.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// 1-based attempt counter.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Retry policy chosen at submission.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// When the first attempt was created.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time since the first attempt was created.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub(crate) async fn send(&self) -> ProviderResult<String> {
        self.provider
            .send(&self.prompt, self.system_prompt(), self.model())
            .await
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("provider_id", &self.provider_id)
            .field("model", &self.model)
            .field("attempt", &self.attempt)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

//! The provider capability invoked by the dispatcher.

use async_trait::async_trait;
use courier_error::ProviderResult;

/// Core trait that every LLM provider must implement.
///
/// A provider sends one prompt and returns the completion text, or a failure
/// already classified into the provider error taxonomy. Implementations must
/// be safe to call concurrently for different requests; the dispatcher
/// enforces rate limits and retries, so providers should not.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use courier_error::ProviderResult;
/// use courier_interface::Provider;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Provider for Echo {
///     fn provider_id(&self) -> &str {
///         "echo"
///     }
///
///     async fn send(
///         &self,
///         prompt: &str,
///         _system_prompt: Option<&str>,
///         _model: Option<&str>,
///     ) -> ProviderResult<String> {
///         Ok(prompt.to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier used to key rate limit state (e.g., "openai").
    fn provider_id(&self) -> &str;

    /// Send a prompt and wait for the completion.
    async fn send(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        model: Option<&str>,
    ) -> ProviderResult<String>;
}

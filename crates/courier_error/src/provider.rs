//! Provider error taxonomy and retry classification.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Classified provider failure conditions.
///
/// This is a closed set: anything a provider cannot classify more precisely
/// is reported as [`ProviderErrorKind::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Account quota is exhausted
    QuotaExceeded {
        /// When the quota resets, if the provider said so
        reset_time: Option<DateTime<Utc>>,
    },
    /// Credentials were rejected
    InvalidKey,
    /// Transport-level failure
    Network {
        /// Underlying cause
        cause: Option<String>,
    },
    /// Provider is throttling this caller
    RateLimited {
        /// How long the provider asked us to wait
        retry_after: Option<Duration>,
    },
    /// Response could not be interpreted
    InvalidResponse {
        /// What was wrong with it
        details: Option<String>,
    },
    /// Provider is down, overloaded, or the call was cancelled
    ServiceUnavailable,
    /// Provider refused the content
    ContentFiltered {
        /// Reason given by the provider
        reason: Option<String>,
    },
    /// Prompt or completion exceeded the model's token limit
    TokenLimitExceeded {
        /// The limit, if known
        max_tokens: Option<u32>,
    },
    /// Unclassified failure
    Unknown {
        /// Underlying cause
        cause: Option<String>,
    },
}

impl ProviderErrorKind {
    /// Check if this error type should be retried.
    ///
    /// Network failures, outages, throttling and unclassified failures are
    /// transient. Everything else is terminal on first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::Network { .. }
                | ProviderErrorKind::ServiceUnavailable
                | ProviderErrorKind::RateLimited { .. }
                | ProviderErrorKind::Unknown { .. }
        )
    }

    /// Classify an HTTP status code returned by a provider API.
    ///
    /// `retry_after` is only used for 429 responses.
    ///
    /// # Examples
    ///
    /// ```
    /// use courier_error::ProviderErrorKind;
    /// use std::time::Duration;
    ///
    /// let kind = ProviderErrorKind::from_status(429, Some(Duration::from_secs(5)));
    /// assert_eq!(
    ///     kind,
    ///     ProviderErrorKind::RateLimited { retry_after: Some(Duration::from_secs(5)) }
    /// );
    /// assert_eq!(ProviderErrorKind::from_status(401, None), ProviderErrorKind::InvalidKey);
    /// ```
    pub fn from_status(status_code: u16, retry_after: Option<Duration>) -> Self {
        match status_code {
            401 | 403 => ProviderErrorKind::InvalidKey,
            402 => ProviderErrorKind::QuotaExceeded { reset_time: None },
            408 => ProviderErrorKind::Network {
                cause: Some("request timeout".to_string()),
            },
            413 => ProviderErrorKind::TokenLimitExceeded { max_tokens: None },
            429 => ProviderErrorKind::RateLimited { retry_after },
            500 | 502 | 503 | 504 => ProviderErrorKind::ServiceUnavailable,
            400..=499 => ProviderErrorKind::InvalidResponse {
                details: Some(format!("HTTP {}", status_code)),
            },
            _ => ProviderErrorKind::Unknown {
                cause: Some(format!("HTTP {}", status_code)),
            },
        }
    }
}

fn write_detail(f: &mut fmt::Formatter<'_>, label: &str, detail: &Option<String>) -> fmt::Result {
    match detail {
        Some(detail) => write!(f, "{}: {}", label, detail),
        None => write!(f, "{}", label),
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::QuotaExceeded { reset_time } => match reset_time {
                Some(reset) => write!(f, "Quota exceeded, resets at {}", reset.to_rfc3339()),
                None => write!(f, "Quota exceeded"),
            },
            ProviderErrorKind::InvalidKey => write!(f, "Invalid API key"),
            ProviderErrorKind::Network { cause } => write_detail(f, "Network error", cause),
            ProviderErrorKind::RateLimited { retry_after } => match retry_after {
                Some(wait) => write!(f, "Rate limited, retry after {}s", wait.as_secs_f64()),
                None => write!(f, "Rate limited"),
            },
            ProviderErrorKind::InvalidResponse { details } => {
                write_detail(f, "Invalid response", details)
            }
            ProviderErrorKind::ServiceUnavailable => write!(f, "Service unavailable"),
            ProviderErrorKind::ContentFiltered { reason } => {
                write_detail(f, "Content filtered", reason)
            }
            ProviderErrorKind::TokenLimitExceeded { max_tokens } => match max_tokens {
                Some(max) => write!(f, "Token limit exceeded (max {})", max),
                None => write!(f, "Token limit exceeded"),
            },
            ProviderErrorKind::Unknown { cause } => write_detail(f, "Unknown error", cause),
        }
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use courier_error::{ProviderError, ProviderErrorKind};
///
/// let err = ProviderError::new("anthropic", ProviderErrorKind::ServiceUnavailable);
/// assert!(err.is_retryable());
/// assert!(format!("{}", err).contains("anthropic"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error ({}): {} at line {} in {}", provider_id, kind, line, file)]
pub struct ProviderError {
    provider_id: String,
    kind: ProviderErrorKind,
    line: u32,
    file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(provider_id: impl Into<String>, kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            provider_id: provider_id.into(),
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Wrap a raw, unclassified failure.
    #[track_caller]
    pub fn unknown(provider_id: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::new(
            provider_id,
            ProviderErrorKind::Unknown {
                cause: Some(cause.to_string()),
            },
        )
    }

    /// The error reported to callers whose requests were cancelled.
    #[track_caller]
    pub fn service_unavailable(provider_id: impl Into<String>) -> Self {
        Self::new(provider_id, ProviderErrorKind::ServiceUnavailable)
    }

    /// Provider that produced the failure.
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ProviderErrorKind {
        &self.kind
    }

    /// Line number where the error was created.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// File where the error was created.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Whether the dispatcher may retry this failure.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Provider-requested wait for `RateLimited` failures.
    ///
    /// Returns `None` for other kinds, and for `RateLimited` without a hint.
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ProviderErrorKind::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether this failure asks the caller to back off from the provider.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.kind, ProviderErrorKind::RateLimited { .. })
    }
}

/// Trait for errors that support retry logic.
///
/// The dispatcher consults failures only through this trait, so retry
/// eligibility stays a pure function of the error kind.
///
/// # Examples
///
/// ```
/// use courier_error::{ProviderError, ProviderErrorKind, RetryableError};
///
/// let err = ProviderError::new("gemini", ProviderErrorKind::Network { cause: None });
/// assert!(err.is_retryable());
///
/// let err = ProviderError::new("gemini", ProviderErrorKind::ContentFiltered { reason: None });
/// assert!(!err.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for ProviderErrorKind {
    fn is_retryable(&self) -> bool {
        ProviderErrorKind::is_retryable(self)
    }
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

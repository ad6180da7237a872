//! Error types for the Courier dispatcher.
//!
//! This crate provides the error taxonomy shared by every Courier crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Provider failures are classified into [`ProviderErrorKind`] at the point
//! they cross the provider boundary. Retry eligibility is decided only by
//! [`ProviderErrorKind::is_retryable`].
//!
//! # Examples
//!
//! ```
//! use courier_error::{ProviderError, ProviderErrorKind, ProviderResult};
//!
//! fn call_provider() -> ProviderResult<String> {
//!     Err(ProviderError::new("openai", ProviderErrorKind::InvalidKey))
//! }
//!
//! let err = call_provider().unwrap_err();
//! assert_eq!(err.provider_id(), "openai");
//! assert!(!err.is_retryable());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod provider;

pub use config::ConfigError;
pub use error::{CourierError, CourierErrorKind, CourierResult};
pub use provider::{ProviderError, ProviderErrorKind, ProviderResult, RetryableError};

//! Core data types for the Courier dispatcher.
//!
//! This crate provides the immutable configuration records attached to
//! requests and providers, plus request identity.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rate_limit;
mod request_id;
mod retry;

pub use rate_limit::{RateLimitPolicy, RateLimitPolicyBuilder};
pub use request_id::RequestId;
pub use retry::{RetryPolicy, RetryPolicyBuilder};

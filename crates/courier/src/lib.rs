//! Courier - rate-limited, retrying dispatch for LLM providers
//!
//! Courier sits between application code and LLM provider clients. Every
//! call goes through a [`Dispatcher`], which keeps each provider inside its
//! request budget, retries transient failures with exponential backoff, and
//! backs off entirely while a provider reports rate limiting.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use courier::{DispatchConfig, Dispatcher};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     courier::init_console_telemetry()?;
//!
//!     let dispatcher = Dispatcher::new(DispatchConfig::load()?);
//!     let provider = Arc::new(MyProvider::new(std::env::var("API_KEY")?));
//!
//!     let reply = dispatcher
//!         .send_request(provider, "Hello, world!", None, None, None)
//!         .await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Courier is organized as a workspace with focused crates:
//!
//! - `courier_error` - Provider error taxonomy and configuration errors
//! - `courier_core` - Retry and rate limit policies, request ids
//! - `courier_interface` - `Provider` and `ActivityObserver` traits
//! - `courier_rate_limit` - Sliding-window admission and configuration loading
//! - `courier_dispatch` - The dispatcher, its pending queue and statistics
//!
//! This crate (`courier`) re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod telemetry;

pub use telemetry::{init_console_telemetry, init_json_telemetry};

// Errors
pub use courier_error::{
    ConfigError, CourierError, CourierErrorKind, CourierResult, ProviderError,
    ProviderErrorKind, ProviderResult, RetryableError,
};

// Policies and identity
pub use courier_core::{
    RateLimitPolicy, RateLimitPolicyBuilder, RequestId, RetryPolicy, RetryPolicyBuilder,
};

// Traits
pub use courier_interface::{ActivityObserver, NoopActivityObserver, Provider};

// Rate limiting and configuration
pub use courier_rate_limit::{
    DispatchConfig, MAX_THROTTLE, ProviderSnapshot, RateLimitRegistry, RateLimitState, WINDOW,
};

// Dispatch
pub use courier_dispatch::{DispatchStatistics, Dispatcher, ProviderStatistics, Request};

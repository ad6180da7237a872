//! Rate limit bookkeeping and dispatcher configuration.
//!
//! This crate tracks per-provider request history in a 60-second sliding
//! window, applies provider-signalled throttles, and loads the TOML
//! configuration that seeds retry and rate limit defaults.
//!
//! None of the types here are synchronized. The dispatcher owns them behind
//! its single lock, which makes each admission check atomic with the
//! timestamp it records.

mod config;
mod registry;
mod state;

pub use config::DispatchConfig;
pub use registry::{ProviderSnapshot, RateLimitRegistry};
pub use state::{MAX_THROTTLE, RateLimitState, WINDOW};

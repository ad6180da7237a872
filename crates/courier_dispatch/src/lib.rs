//! Request dispatch and rate-limiting core.
//!
//! The [`Dispatcher`] mediates every call to an LLM [`Provider`]: it decides
//! when a call may proceed, executes it, retries transient failures with
//! exponential backoff, and holds back requests that would exceed a
//! provider's request budget until a slot frees up.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_dispatch::Dispatcher;
//! use std::sync::Arc;
//!
//! let dispatcher = Dispatcher::default();
//! let provider: Arc<dyn Provider> = Arc::new(OpenAiProvider::new(key));
//! let reply = dispatcher
//!     .send_request(provider, "Summarize this", None, Some("gpt-4o".into()), None)
//!     .await?;
//! ```
//!
//! [`Provider`]: courier_interface::Provider

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod dispatcher;
mod pending;
mod request;
mod statistics;

pub use dispatcher::Dispatcher;
pub use request::Request;
pub use statistics::{DispatchStatistics, ProviderStatistics};

//! Trait definitions for the Courier dispatcher.
//!
//! Providers and observers are implemented outside the dispatcher core and
//! are consumed through the traits in this crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod observer;
mod provider;

pub use observer::{ActivityObserver, NoopActivityObserver};
pub use provider::Provider;

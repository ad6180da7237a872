//! Advisory lifecycle signals for UI and telemetry collaborators.

/// Receives activity lifecycle signals from the dispatcher.
///
/// Callbacks run on the dispatching task, outside the dispatch state lock,
/// one at a time and in the order activity changed. They must return quickly
/// and must not call back into the dispatcher synchronously.
pub trait ActivityObserver: Send + Sync {
    /// The dispatcher went from idle to having at least one active call.
    fn activity_started(&self);

    /// The last active call reached its terminal outcome.
    fn activity_finished(&self);
}

/// Observer that ignores every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActivityObserver;

impl ActivityObserver for NoopActivityObserver {
    fn activity_started(&self) {}

    fn activity_finished(&self) {}
}

//! Requests waiting for admission.

use crate::Request;
use courier_error::ProviderResult;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// Completion handle that resolves the original caller exactly once.
pub(crate) type Responder = oneshot::Sender<ProviderResult<String>>;

/// A request that could not be admitted yet, and the caller waiting on it.
pub(crate) struct PendingEntry {
    pub(crate) request: Request,
    pub(crate) responder: Responder,
}

/// Result of one pass over the queue.
pub(crate) struct Drained {
    pub(crate) admitted: Vec<PendingEntry>,
    pub(crate) abandoned: usize,
}

/// Arrival-ordered queue shared by all providers.
///
/// Entries leave the queue before their responder is used, so no entry can
/// be resolved twice.
#[derive(Default)]
pub(crate) struct PendingQueue {
    entries: VecDeque<PendingEntry>,
}

impl PendingQueue {
    pub(crate) fn push(&mut self, entry: PendingEntry) {
        self.entries.push_back(entry);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry `admit` accepts, scanning in arrival order.
    ///
    /// Entries whose caller stopped waiting are dropped without consulting
    /// `admit`. The rest keep their relative order.
    pub(crate) fn drain_admissible(&mut self, mut admit: impl FnMut(&Request) -> bool) -> Drained {
        let mut admitted = Vec::new();
        let mut abandoned = 0;
        let mut remaining = VecDeque::with_capacity(self.entries.len());

        for entry in self.entries.drain(..) {
            if entry.responder.is_closed() {
                abandoned += 1;
            } else if admit(&entry.request) {
                admitted.push(entry);
            } else {
                remaining.push_back(entry);
            }
        }

        self.entries = remaining;
        Drained {
            admitted,
            abandoned,
        }
    }

    /// Remove and return every entry for one provider.
    pub(crate) fn remove_provider(&mut self, provider_id: &str) -> Vec<PendingEntry> {
        let mut removed = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.entries.len());

        for entry in self.entries.drain(..) {
            if entry.request.provider_id() == provider_id {
                removed.push(entry);
            } else {
                remaining.push_back(entry);
            }
        }

        self.entries = remaining;
        removed
    }

    /// Distinct provider ids with queued entries, in first-arrival order.
    pub(crate) fn provider_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for entry in &self.entries {
            let id = entry.request.provider_id();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::RetryPolicy;
    use courier_interface::Provider;
    use std::sync::Arc;

    struct Named(&'static str);

    #[async_trait]
    impl Provider for Named {
        fn provider_id(&self) -> &str {
            self.0
        }

        async fn send(
            &self,
            prompt: &str,
            _system_prompt: Option<&str>,
            _model: Option<&str>,
        ) -> ProviderResult<String> {
            Ok(prompt.to_string())
        }
    }

    fn entry(
        provider: &'static str,
        prompt: &str,
    ) -> (PendingEntry, oneshot::Receiver<ProviderResult<String>>) {
        let (responder, receiver) = oneshot::channel();
        let request = Request::new(
            Arc::new(Named(provider)),
            prompt,
            None,
            None,
            RetryPolicy::default(),
        );
        (PendingEntry { request, responder }, receiver)
    }

    fn prompts(queue: &PendingQueue) -> Vec<String> {
        queue
            .entries
            .iter()
            .map(|e| e.request.prompt().to_string())
            .collect()
    }

    #[test]
    fn test_drain_preserves_order_of_remaining() {
        let mut queue = PendingQueue::default();
        let mut receivers = Vec::new();
        for (provider, prompt) in [("a", "a1"), ("b", "b1"), ("a", "a2"), ("b", "b2")] {
            let (entry, receiver) = entry(provider, prompt);
            queue.push(entry);
            receivers.push(receiver);
        }

        let drained = queue.drain_admissible(|request| request.provider_id() == "b");
        let admitted: Vec<&str> = drained.admitted.iter().map(|e| e.request.prompt()).collect();
        assert_eq!(admitted, vec!["b1", "b2"]);
        assert_eq!(drained.abandoned, 0);
        assert_eq!(prompts(&queue), vec!["a1", "a2"]);
    }

    #[test]
    fn test_drain_drops_abandoned_entries() {
        let mut queue = PendingQueue::default();
        let (first, first_rx) = entry("a", "gone");
        let (second, _second_rx) = entry("a", "waiting");
        queue.push(first);
        queue.push(second);
        drop(first_rx);

        let mut consulted = Vec::new();
        let drained = queue.drain_admissible(|request| {
            consulted.push(request.prompt().to_string());
            false
        });
        assert_eq!(drained.abandoned, 1);
        assert!(drained.admitted.is_empty());
        assert_eq!(consulted, vec!["waiting"]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_provider_leaves_others() {
        let mut queue = PendingQueue::default();
        let mut receivers = Vec::new();
        for (provider, prompt) in [("a", "a1"), ("b", "b1"), ("a", "a2")] {
            let (entry, receiver) = entry(provider, prompt);
            queue.push(entry);
            receivers.push(receiver);
        }

        let removed = queue.remove_provider("a");
        assert_eq!(removed.len(), 2);
        assert_eq!(prompts(&queue), vec!["b1"]);
        assert_eq!(queue.provider_ids(), vec!["b"]);
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_provider_ids_are_distinct() {
        let mut queue = PendingQueue::default();
        let mut receivers = Vec::new();
        for (provider, prompt) in [("b", "b1"), ("a", "a1"), ("b", "b2")] {
            let (entry, receiver) = entry(provider, prompt);
            queue.push(entry);
            receivers.push(receiver);
        }
        assert_eq!(queue.provider_ids(), vec!["b", "a"]);
    }
}

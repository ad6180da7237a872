//! Read-only dispatcher snapshots for observability collaborators.

use chrono::{DateTime, Utc};
use courier_rate_limit::ProviderSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;

/// Rate limit view of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatistics {
    /// Requests admitted within the last 60 seconds
    pub recent_request_count: usize,
    /// Whether a provider-signalled throttle is in force
    pub is_throttled: bool,
    /// Wall-clock time of the most recent admission
    pub last_request_time: Option<DateTime<Utc>>,
}

impl From<ProviderSnapshot> for ProviderStatistics {
    fn from(snapshot: ProviderSnapshot) -> Self {
        Self {
            recent_request_count: snapshot.recent_request_count,
            is_throttled: snapshot.is_throttled,
            last_request_time: snapshot.last_request_time,
        }
    }
}

/// Snapshot of dispatcher state, taken under the dispatcher lock.
///
/// A call sleeping between retry attempts still counts as in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchStatistics {
    /// Admitted calls that have not reached a terminal outcome
    pub in_flight_count: usize,
    /// Calls waiting for admission
    pub pending_count: usize,
    /// Every provider with recorded state, keyed by provider id
    pub providers: BTreeMap<String, ProviderStatistics>,
}

impl DispatchStatistics {
    /// Statistics for one provider, if it has recorded state.
    pub fn provider(&self, provider_id: &str) -> Option<&ProviderStatistics> {
        self.providers.get(provider_id)
    }
}

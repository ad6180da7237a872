//! Admission control, execution and retry for provider calls.
//!
//! All shared state lives in one [`DispatchState`] behind a single
//! `parking_lot::Mutex`. The lock is only ever held for bookkeeping: provider
//! calls, backoff sleeps and observer callbacks all run with it released.
//! Observer callbacks are serialized by a separate activity counter lock.
//!
//! Every admitted call runs on its own spawned task. The submitting caller
//! waits on a oneshot channel, so a caller that gives up never leaves
//! in-flight bookkeeping behind.

use crate::pending::{PendingEntry, PendingQueue, Responder};
use crate::{DispatchStatistics, ProviderStatistics, Request};
use courier_core::{RateLimitPolicy, RequestId, RetryPolicy};
use courier_error::{
    CourierResult, ProviderError, ProviderErrorKind, ProviderResult, RetryableError,
};
use courier_interface::{ActivityObserver, NoopActivityObserver, Provider};
use courier_rate_limit::{DispatchConfig, RateLimitRegistry};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Notify, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// An admitted call that has not reached a terminal outcome.
struct InFlight {
    provider_id: String,
    cancel: Arc<Notify>,
}

/// Everything guarded by the dispatcher lock.
struct DispatchState {
    limits: RateLimitRegistry,
    in_flight: HashMap<RequestId, InFlight>,
    pending: PendingQueue,
    wakeup_at: Option<Instant>,
}

impl DispatchState {
    fn register(&mut self, request: &Request) -> Arc<Notify> {
        let cancel = Arc::new(Notify::new());
        self.in_flight.insert(
            request.id(),
            InFlight {
                provider_id: request.provider_id().to_string(),
                cancel: Arc::clone(&cancel),
            },
        );
        cancel
    }

    /// Pick the next drain wakeup if it is earlier than the one already armed.
    ///
    /// Returns the instant a new timer must be spawned for, if any.
    fn claim_wakeup(&mut self, now: Instant) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }

        let earliest = self
            .pending
            .provider_ids()
            .into_iter()
            .filter_map(|provider_id| self.limits.ready_at(provider_id, now))
            .min()?;

        match self.wakeup_at {
            Some(armed) if armed > now && armed <= earliest => None,
            _ => {
                self.wakeup_at = Some(earliest);
                Some(earliest)
            }
        }
    }
}

struct DispatcherInner {
    state: Mutex<DispatchState>,
    /// Active logical calls. Held while the observer is signalled, so
    /// signals reach it in the order the count changed.
    activity: Mutex<usize>,
    default_retry: RetryPolicy,
    default_throttle: Duration,
    observer: Arc<dyn ActivityObserver>,
}

/// Rate-limited, retrying front door to every provider.
///
/// Cloning is cheap; clones share the same state.
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::new(DispatchConfig::load()?);
/// dispatcher.configure_rate_limit("openai", RateLimitPolicy::builder().burst(20).build())?;
///
/// let reply = dispatcher
///     .send_request(provider, "Translate to French: hello", None, None, None)
///     .await?;
///
/// let stats = dispatcher.get_statistics();
/// println!("{} in flight, {} queued", stats.in_flight_count, stats.pending_count);
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl Dispatcher {
    /// Create a dispatcher from configuration.
    ///
    /// Provider overrides in the configuration become the initial policy
    /// table; [`Self::configure_rate_limit`] replaces entries later.
    pub fn new(config: DispatchConfig) -> Self {
        Self::with_observer(config, Arc::new(NoopActivityObserver))
    }

    /// Create a dispatcher that reports activity to `observer`.
    ///
    /// Policies in `config` that fail validation are logged and replaced by
    /// the built-in defaults. [`DispatchConfig::load`] rejects them up front.
    pub fn with_observer(config: DispatchConfig, observer: Arc<dyn ActivityObserver>) -> Self {
        let default_policy = match config.rate_limit.validate() {
            Ok(()) => config.rate_limit,
            Err(e) => {
                warn!(error = %e, "Invalid default rate limit, using built-in default");
                RateLimitPolicy::default()
            }
        };
        let default_retry = match config.retry.validate() {
            Ok(()) => config.retry.clone(),
            Err(e) => {
                warn!(error = %e, "Invalid default retry policy, using built-in default");
                RetryPolicy::default()
            }
        };

        let mut limits = RateLimitRegistry::new(default_policy);
        for (provider_id, policy) in &config.providers {
            if let Err(e) = limits.configure(provider_id, *policy) {
                warn!(
                    provider = %provider_id,
                    error = %e,
                    "Ignoring invalid rate limit override"
                );
            }
        }

        Self {
            inner: Arc::new(DispatcherInner {
                state: Mutex::new(DispatchState {
                    limits,
                    in_flight: HashMap::new(),
                    pending: PendingQueue::default(),
                    wakeup_at: None,
                }),
                activity: Mutex::new(0),
                default_throttle: config.default_throttle(),
                default_retry,
                observer,
            }),
        }
    }

    /// Retry policy used when a request is submitted without one.
    pub fn default_retry_policy(&self) -> &RetryPolicy {
        &self.inner.default_retry
    }

    /// Send a prompt, waiting for admission, retries and the final outcome.
    ///
    /// Transient failures are retried according to `retry_policy` (or the
    /// dispatcher default) and are invisible to the caller unless every
    /// attempt fails. Terminal failures are returned on first occurrence.
    ///
    /// # Errors
    ///
    /// Returns the classified provider failure, or `ServiceUnavailable` if
    /// the request was cancelled with [`Self::cancel_requests`]. An invalid
    /// `retry_policy` is rejected with `InvalidResponse` before the provider
    /// is called.
    #[instrument(
        skip(self, provider, prompt, system_prompt, retry_policy),
        fields(provider = provider.provider_id())
    )]
    pub async fn send_request(
        &self,
        provider: Arc<dyn Provider>,
        prompt: impl Into<String>,
        system_prompt: Option<String>,
        model: Option<String>,
        retry_policy: Option<RetryPolicy>,
    ) -> ProviderResult<String> {
        let retry_policy = match retry_policy {
            Some(policy) => {
                if let Err(e) = policy.validate() {
                    warn!(error = %e, "Rejected retry policy override");
                    return Err(ProviderError::new(
                        provider.provider_id(),
                        ProviderErrorKind::InvalidResponse {
                            details: Some(format!("invalid retry policy: {}", e)),
                        },
                    ));
                }
                policy
            }
            None => self.inner.default_retry.clone(),
        };
        let request = Request::new(provider, prompt, system_prompt, model, retry_policy);
        let provider_id = request.provider_id().to_string();

        let _activity = ActivityGuard::enter(&self.inner);
        let (responder, completion) = oneshot::channel();
        self.submit(request, responder);

        match completion.await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::unknown(
                provider_id,
                "dispatch task ended without a result",
            )),
        }
    }

    /// Replace the rate limit policy for one provider.
    ///
    /// Timestamps already recorded for the provider count against the new
    /// policy. Queued requests are re-evaluated immediately.
    ///
    /// # Errors
    ///
    /// Returns a configuration error, and keeps the current policy, if
    /// `policy` fails validation.
    pub fn configure_rate_limit(
        &self,
        provider_id: &str,
        policy: RateLimitPolicy,
    ) -> CourierResult<()> {
        self.inner.state.lock().limits.configure(provider_id, policy)?;
        self.drain_pending();
        Ok(())
    }

    /// Cancel every queued and in-flight request for one provider.
    ///
    /// Affected callers receive `ServiceUnavailable` immediately. A provider
    /// call already in progress is abandoned and its result is never seen.
    pub fn cancel_requests(&self, provider_id: &str) {
        let (cancelled_in_flight, cancelled_pending) = {
            let mut state = self.inner.state.lock();
            let mut in_flight = Vec::new();
            state.in_flight.retain(|_, call| {
                if call.provider_id == provider_id {
                    in_flight.push(Arc::clone(&call.cancel));
                    false
                } else {
                    true
                }
            });
            (in_flight, state.pending.remove_provider(provider_id))
        };

        info!(
            provider = provider_id,
            in_flight = cancelled_in_flight.len(),
            pending = cancelled_pending.len(),
            "Cancelled requests"
        );

        for cancel in cancelled_in_flight {
            cancel.notify_one();
        }
        for entry in cancelled_pending {
            resolve(
                entry.request.id(),
                entry.responder,
                Err(ProviderError::service_unavailable(provider_id)),
            );
        }
    }

    /// Snapshot of in-flight and queued counts plus per-provider state.
    pub fn get_statistics(&self) -> DispatchStatistics {
        let now = Instant::now();
        let state = self.inner.state.lock();
        DispatchStatistics {
            in_flight_count: state.in_flight.len(),
            pending_count: state.pending.len(),
            providers: state
                .limits
                .snapshot(now)
                .into_iter()
                .map(|snapshot| {
                    let provider_id = snapshot.provider_id.clone();
                    (provider_id, ProviderStatistics::from(snapshot))
                })
                .collect(),
        }
    }

    /// Admit a request now or park it in the pending queue.
    fn submit(&self, request: Request, responder: Responder) {
        let now = Instant::now();
        let mut state = self.inner.state.lock();

        if state.limits.try_admit(request.provider_id(), now) {
            let cancel = state.register(&request);
            drop(state);
            debug!(request_id = %request.id(), "Admitted");
            self.spawn_call(request, cancel, responder);
            return;
        }

        debug!(
            request_id = %request.id(),
            attempt = request.attempt(),
            "Admission denied, queued"
        );
        state.pending.push(PendingEntry { request, responder });
        let wakeup = state.claim_wakeup(now);
        drop(state);

        if let Some(at) = wakeup {
            self.spawn_wakeup(at);
        }
    }

    /// Admit every queued request whose provider now has room.
    fn drain_pending(&self) {
        let now = Instant::now();
        let (admitted, wakeup) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if state.pending.is_empty() {
                return;
            }

            let limits = &mut state.limits;
            let drained = state
                .pending
                .drain_admissible(|request| limits.try_admit(request.provider_id(), now));

            if drained.abandoned > 0 {
                debug!(abandoned = drained.abandoned, "Discarded abandoned requests");
            }

            let admitted: Vec<(PendingEntry, Arc<Notify>)> = drained
                .admitted
                .into_iter()
                .map(|entry| {
                    let cancel = state.register(&entry.request);
                    (entry, cancel)
                })
                .collect();

            if !admitted.is_empty() {
                debug!(
                    admitted = admitted.len(),
                    still_queued = state.pending.len(),
                    "Drained pending queue"
                );
            }
            (admitted, state.claim_wakeup(now))
        };

        for (entry, cancel) in admitted {
            self.spawn_call(entry.request, cancel, entry.responder);
        }
        if let Some(at) = wakeup {
            self.spawn_wakeup(at);
        }
    }

    /// Run a drain at `at` unless the dispatcher has been dropped by then.
    fn spawn_wakeup(&self, at: Instant) {
        let inner: Weak<DispatcherInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep_until(at).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            {
                let mut state = inner.state.lock();
                if state.wakeup_at == Some(at) {
                    state.wakeup_at = None;
                }
            }
            Dispatcher { inner }.drain_pending();
        });
    }

    fn spawn_call(&self, request: Request, cancel: Arc<Notify>, responder: Responder) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.run(request, cancel, responder).await;
        });
    }

    /// Execute an admitted request until it succeeds, fails terminally, is
    /// cancelled, or has to wait in the queue for re-admission.
    async fn run(&self, mut request: Request, cancel: Arc<Notify>, responder: Responder) {
        loop {
            debug!(
                request_id = %request.id(),
                provider = request.provider_id(),
                attempt = request.attempt(),
                "Calling provider"
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.notified() => {
                    resolve(
                        request.id(),
                        responder,
                        Err(ProviderError::service_unavailable(request.provider_id())),
                    );
                    return;
                }
                outcome = call_provider(&request) => outcome,
            };

            let err = match outcome {
                Ok(response) => {
                    let result = if self.complete(request.id()) {
                        info!(
                            request_id = %request.id(),
                            provider = request.provider_id(),
                            attempts = request.attempt(),
                            elapsed_ms = request.elapsed().as_millis() as u64,
                            "Request succeeded"
                        );
                        Ok(response)
                    } else {
                        Err(ProviderError::service_unavailable(request.provider_id()))
                    };
                    resolve(request.id(), responder, result);
                    return;
                }
                Err(err) => err,
            };

            let kind: &str = err.kind().as_ref();
            if err.is_rate_limited() {
                self.apply_throttle(request.provider_id(), err.retry_after());
            }

            let exhausted = !request.retry_policy().allows_retry_after(request.attempt());
            if !err.is_retryable() || exhausted {
                warn!(
                    request_id = %request.id(),
                    provider = request.provider_id(),
                    attempts = request.attempt(),
                    kind,
                    elapsed_ms = request.elapsed().as_millis() as u64,
                    "Request failed: {}",
                    err
                );
                let result = if self.complete(request.id()) {
                    Err(err)
                } else {
                    Err(ProviderError::service_unavailable(request.provider_id()))
                };
                resolve(request.id(), responder, result);
                return;
            }

            let delay = request.retry_policy().delay(request.attempt());
            warn!(
                request_id = %request.id(),
                provider = request.provider_id(),
                attempt = request.attempt(),
                delay_ms = delay.as_millis() as u64,
                kind,
                "Transient error, will retry"
            );

            let cancelled = tokio::select! {
                biased;
                _ = cancel.notified() => true,
                _ = tokio::time::sleep(delay) => false,
            };
            if cancelled {
                resolve(
                    request.id(),
                    responder,
                    Err(ProviderError::service_unavailable(request.provider_id())),
                );
                return;
            }

            request = request.next_attempt();

            let now = Instant::now();
            let mut state = self.inner.state.lock();
            if !state.in_flight.contains_key(&request.id()) {
                drop(state);
                resolve(
                    request.id(),
                    responder,
                    Err(ProviderError::service_unavailable(request.provider_id())),
                );
                return;
            }
            if state.limits.try_admit(request.provider_id(), now) {
                continue;
            }

            // Requeued: a later drain starts a fresh task for this request.
            state.in_flight.remove(&request.id());
            debug!(
                request_id = %request.id(),
                attempt = request.attempt(),
                "Retry denied admission, queued"
            );
            state.pending.push(PendingEntry { request, responder });
            let wakeup = state.claim_wakeup(now);
            drop(state);

            if let Some(at) = wakeup {
                self.spawn_wakeup(at);
            }
            return;
        }
    }

    /// Throttle a provider after it reported rate limiting.
    fn apply_throttle(&self, provider_id: &str, retry_after: Option<Duration>) {
        let duration = retry_after.unwrap_or(self.inner.default_throttle);
        let now = Instant::now();
        let wakeup = {
            let mut state = self.inner.state.lock();
            state.limits.apply_throttle(provider_id, duration, now);
            state.claim_wakeup(now)
        };
        if let Some(at) = wakeup {
            self.spawn_wakeup(at);
        }
    }

    /// Drop a finished call from the in-flight set and let queued work in.
    ///
    /// Returns `false` if the call had already been cancelled.
    fn complete(&self, id: RequestId) -> bool {
        let registered = self.inner.state.lock().in_flight.remove(&id).is_some();
        self.drain_pending();
        registered
    }
}

/// Hand a terminal outcome to the caller, if it is still waiting.
fn resolve(id: RequestId, responder: Responder, result: ProviderResult<String>) {
    if let Err(dropped) = responder.send(result) {
        debug!(
            request_id = %id,
            succeeded = dropped.is_ok(),
            "Caller stopped waiting, outcome dropped"
        );
    }
}

/// Call the provider, classifying a panic as an unknown failure.
async fn call_provider(request: &Request) -> ProviderResult<String> {
    match AssertUnwindSafe(request.send()).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::unknown(
            request.provider_id(),
            "provider panicked",
        )),
    }
}

/// Counts a logical call as active for the activity observer.
struct ActivityGuard {
    inner: Arc<DispatcherInner>,
}

impl ActivityGuard {
    fn enter(inner: &Arc<DispatcherInner>) -> Self {
        let mut active = inner.activity.lock();
        *active += 1;
        if *active == 1 {
            debug!("Activity started");
            inner.observer.activity_started();
        }
        drop(active);

        Self {
            inner: Arc::clone(inner),
        }
    }
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        let mut active = self.inner.activity.lock();
        *active = active.saturating_sub(1);
        if *active == 0 {
            debug!("Activity finished");
            self.inner.observer.activity_finished();
        }
    }
}

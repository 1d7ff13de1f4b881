//! The Request Coordinator: TTL cache, in-flight dedup, and retry with
//! exponential backoff, keyed by the domain-supplied fingerprints that
//! [`crate::cache_key::CacheKeyBuilder`] produces.
//!
//! An in-flight fetch is modeled as a `tokio::sync::broadcast` channel that
//! ever carries exactly one terminal `Result` — "one producer, many
//! subscribers share a single value" without the backlog semantics a queue
//! of events would need.

mod entry;
mod retry;

pub use entry::ExecuteOptions;
pub use retry::{RetryClass, backoff_delay, is_retryable};

use crate::config::CoordinatorConfig;
use crate::error::{BoxFuture, CoordinatorError, FetchError};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as DashEntry;
use entry::{CacheEntry, InFlightEntry, SubscriptionGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// A function producing a fresh fetch attempt each time it's called, boxed
/// so `execute` can retry it without the caller needing to clone a closure.
pub type Produce<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync>;

/// TTL cache + in-flight dedup + retry-with-backoff over payloads of type
/// `T`. One coordinator instance is shared (typically via `Arc`) across
/// every resource orchestrator that fetches the same kind of payload — a
/// process-wide singleton, made concrete as a monomorphized-per-payload-type
/// singleton rather than a single any-payload-type instance (see DESIGN.md).
pub struct RequestCoordinator<T: Clone + Send + Sync + 'static> {
    config: CoordinatorConfig,
    cache: Arc<DashMap<String, CacheEntry<T>>>,
    inflight: Arc<DashMap<String, InFlightEntry<T>>>,
    loading_keys: Arc<DashMap<String, watch::Sender<bool>>>,
    global_loading: Arc<watch::Sender<bool>>,
    active_loading_count: Arc<AtomicUsize>,
}

impl<T: Clone + Send + Sync + 'static> RequestCoordinator<T> {
    #[must_use]
    pub fn new(config: CoordinatorConfig) -> Self {
        let (global_loading, _) = watch::channel(false);
        Self {
            config,
            cache: Arc::new(DashMap::new()),
            inflight: Arc::new(DashMap::new()),
            loading_keys: Arc::new(DashMap::new()),
            global_loading: Arc::new(global_loading),
            active_loading_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run `produce` through the cache and in-flight dedup for `request_key`.
    ///
    /// `produce` is only ever invoked by whichever caller happens to win the
    /// race to create the in-flight record for `request_key`; every other
    /// concurrent or later caller within the in-flight window shares its
    /// result.
    pub async fn execute(
        &self,
        request_key: impl Into<String>,
        produce: Produce<T>,
        opts: ExecuteOptions,
    ) -> Result<T, CoordinatorError> {
        let key = request_key.into();

        if !opts.skip_cache {
            if let Some(entry) = self.cache.get(&key) {
                if entry.expires_at > Instant::now() {
                    return Ok(entry.payload.clone());
                }
            }
        }

        let (mut rx, spawn_owner, subscriber_count) = self.join_or_create(&key);
        // Held across the `.await` below so that if this call is cancelled
        // (e.g. an orchestrator's `dispose()` aborting the task driving it),
        // dropping the guard decrements `subscriber_count` and lets the
        // owning retry loop notice it has no subscribers left.
        let _guard = SubscriptionGuard::new(subscriber_count.clone());

        if spawn_owner {
            self.spawn_owner(key.clone(), produce, opts, subscriber_count);
        }

        match rx.recv().await {
            Ok(result) => result,
            Err(broadcast::error::RecvError::Closed) => Err(CoordinatorError::Cancelled),
            Err(broadcast::error::RecvError::Lagged(_)) => {
                // Capacity is 1 and exactly one value is ever sent, so a lag
                // can only mean we subscribed after the value was already
                // delivered and dropped — re-enter rather than hang.
                self.execute_cached_or_retry(&key).await
            }
        }
    }

    async fn execute_cached_or_retry(&self, key: &str) -> Result<T, CoordinatorError> {
        if let Some(entry) = self.cache.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(entry.payload.clone());
            }
        }
        Err(CoordinatorError::Cancelled)
    }

    fn join_or_create(
        &self,
        key: &str,
    ) -> (broadcast::Receiver<Result<T, CoordinatorError>>, bool, Arc<AtomicUsize>) {
        match self.inflight.entry(key.to_string()) {
            DashEntry::Occupied(existing) => {
                existing.get().subscriber_count.fetch_add(1, Ordering::AcqRel);
                (existing.get().sender.subscribe(), false, existing.get().subscriber_count.clone())
            }
            DashEntry::Vacant(vacant) => {
                let (sender, _) = broadcast::channel(1);
                let rx = sender.subscribe();
                let subscriber_count = Arc::new(AtomicUsize::new(1));
                vacant.insert(InFlightEntry { sender, subscriber_count: subscriber_count.clone() });
                (rx, true, subscriber_count)
            }
        }
    }

    fn spawn_owner(
        &self,
        key: String,
        produce: Produce<T>,
        opts: ExecuteOptions,
        subscriber_count: Arc<AtomicUsize>,
    ) {
        self.set_loading(&key, true);

        let cache = self.cache.clone();
        let inflight = self.inflight.clone();
        let loading_keys = self.loading_keys.clone();
        let global_loading = self.global_loading.clone();
        let active_loading_count = self.active_loading_count.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            let outcome = run_with_retry(produce.as_ref(), &config, &opts, &subscriber_count).await;

            let coordinator_result = match &outcome {
                Ok(payload) => {
                    let ttl = opts.cache_ttl.unwrap_or(config.cache_ttl);
                    cache.insert(
                        key.clone(),
                        CacheEntry { payload: payload.clone(), expires_at: Instant::now() + ttl },
                    );
                    Ok(payload.clone())
                }
                Err(err) => Err(CoordinatorError::Fetch(err.clone())),
            };

            if let Some((_, entry)) = inflight.remove(&key) {
                // Best-effort: if every subscriber already dropped its
                // receiver this returns Err, which is fine — nobody is
                // listening for the result any more.
                let _ = entry.sender.send(coordinator_result);
            }

            set_loading_static(&loading_keys, &global_loading, &active_loading_count, &key, false);
        });
    }

    fn set_loading(&self, key: &str, loading: bool) {
        set_loading_static(&self.loading_keys, &self.global_loading, &self.active_loading_count, key, loading);
    }

    /// Per-key loading stream: `true` while a fetch for `key` is in flight.
    #[must_use]
    pub fn loading_stream(&self, key: &str) -> watch::Receiver<bool> {
        self.loading_keys
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }

    /// Global loading stream: `true` iff any key is currently in flight.
    #[must_use]
    pub fn global_loading_stream(&self) -> watch::Receiver<bool> {
        self.global_loading.subscribe()
    }

    /// Explicitly drop a cache entry, e.g. on `dispose()` of an owning
    /// orchestrator or an explicit cache-clear request.
    pub fn invalidate(&self, key: &str) {
        self.cache.remove(key);
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

fn set_loading_static(
    loading_keys: &DashMap<String, watch::Sender<bool>>,
    global_loading: &watch::Sender<bool>,
    active_loading_count: &AtomicUsize,
    key: &str,
    loading: bool,
) {
    let sender = loading_keys
        .entry(key.to_string())
        .or_insert_with(|| watch::channel(false).0);
    sender.send_if_modified(|current| {
        if *current == loading {
            return false;
        }
        *current = loading;
        true
    });
    drop(sender);

    let previous = if loading {
        active_loading_count.fetch_add(1, Ordering::AcqRel)
    } else {
        active_loading_count.fetch_sub(1, Ordering::AcqRel)
    };
    let now_active = if loading { previous + 1 } else { previous.saturating_sub(1) };
    global_loading.send_if_modified(|current| {
        let next = now_active > 0;
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}

async fn run_with_retry<T>(
    produce: &(dyn Fn() -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync),
    config: &CoordinatorConfig,
    opts: &ExecuteOptions,
    subscriber_count: &AtomicUsize,
) -> Result<T, FetchError> {
    let max_retries = opts.max_retries.unwrap_or(config.max_retries);
    let initial_delay = opts.initial_retry_delay.unwrap_or(config.initial_retry_delay);

    let mut attempt: u32 = 0;
    loop {
        // Every caller sharing this request has dropped its `SubscriptionGuard`
        // (returned, or been cancelled) — further attempts or backoff would
        // only spend work nobody is waiting on.
        if subscriber_count.load(Ordering::Acquire) == 0 {
            debug!(attempt, "request coordinator abandoning retry loop, no subscribers remain");
            return Err(FetchError::msg("abandoned: no subscribers remain"));
        }
        match produce().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let class = RetryClass::classify(&err);
                if attempt >= max_retries || !class.is_retryable() {
                    warn!(attempt, ?class, "request coordinator giving up");
                    return Err(err);
                }
                attempt += 1;
                let jitter_sample = if config.retry_jitter > 0.0 {
                    rand::random::<f64>() * 2.0 - 1.0
                } else {
                    0.0
                };
                let delay = backoff_delay(
                    attempt,
                    initial_delay,
                    config.max_retry_delay,
                    class,
                    config.retry_jitter,
                    jitter_sample,
                );
                debug!(attempt, ?class, ?delay, "request coordinator retrying after backoff");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

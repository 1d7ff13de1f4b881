//! Resource Orchestrator: the generic state machine wiring the
//! broker, mapper, adapter, and coordinator into one `(Filters, Data,
//! Statistics)` stream.
//!
//! Turns a stream of URL broker emissions into a stream of fetch outcomes by
//! pushing every dispatch through a shared coordinator and retry policy,
//! tagging each with an epoch so a slower, now-superseded fetch can never
//! clobber state a later one already committed.

mod intents;

use crate::adapter::{DataAdapter, FetchOutcome};
use crate::broker::UrlStateBroker;
use crate::cache_key::CacheKeyBuilder;
use crate::config::OrchestratorConfig;
use crate::coordinator::{ExecuteOptions, Produce, RequestCoordinator};
use crate::error::CoordinatorError;
use crate::mapper::FilterMapper;
use crate::state::{ResourceState, StateDelta};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

pub use intents::Intent;

/// The generic `(Filters, Data, Statistics)` state machine. One instance per
/// resource.
///
/// Type parameters mirror the rest of the core: `F`/`D`/`S` are domain-owned;
/// `M`/`A`/`K` are the domain's [`FilterMapper`], [`DataAdapter`], and
/// [`CacheKeyBuilder`] implementations.
pub struct ResourceOrchestrator<F, D, S, M, A, K> {
    mapper: Arc<M>,
    adapter: Arc<A>,
    cache_key_builder: Arc<K>,
    coordinator: Arc<RequestCoordinator<FetchOutcome<D, S>>>,
    config: OrchestratorConfig,
    state: watch::Sender<ResourceState<F, D, S>>,
    // One `watch::Sender` per `state$` slice (§3), each deduplicating on its
    // own value rather than on the whole `ResourceState` — a consumer that
    // only cares about `loading$` must not wake up on a `results$`-only
    // change, and vice versa.
    filters: watch::Sender<F>,
    results: watch::Sender<Vec<D>>,
    loading: watch::Sender<bool>,
    error: watch::Sender<Option<CoordinatorError>>,
    total_results: watch::Sender<u64>,
    statistics: watch::Sender<Option<S>>,
    highlights: watch::Sender<Option<F>>,
    epoch: Arc<AtomicU64>,
    url_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    broker: parking_lot::Mutex<Option<Arc<UrlStateBroker>>>,
}

impl<F, D, S, M, A, K> ResourceOrchestrator<F, D, S, M, A, K>
where
    F: Clone + PartialEq + Send + Sync + 'static,
    D: Clone + PartialEq + Send + Sync + 'static,
    S: Clone + PartialEq + Send + Sync + 'static,
    M: FilterMapper<F> + 'static,
    A: DataAdapter<F, D, S> + 'static,
    K: CacheKeyBuilder<F> + 'static,
{
    /// Construct an orchestrator not yet wired to a URL broker. Used as-is by a secondary window, which only ever
    /// receives state through [`Self::sync_state_from_external`]; a primary
    /// caller additionally calls [`Self::drive_from_broker`].
    #[must_use]
    pub fn new(
        mapper: Arc<M>,
        adapter: Arc<A>,
        cache_key_builder: Arc<K>,
        coordinator: Arc<RequestCoordinator<FetchOutcome<D, S>>>,
        config: OrchestratorConfig,
    ) -> Self {
        let default_filters = mapper.default_filters();
        let initial = ResourceState::initial(default_filters);
        let (filters, _) = watch::channel(initial.filters.clone());
        let (results, _) = watch::channel(initial.results.clone());
        let (loading, _) = watch::channel(initial.loading);
        let (error, _) = watch::channel(None);
        let (total_results, _) = watch::channel(initial.total_results);
        let (statistics, _) = watch::channel(initial.statistics.clone());
        let (highlights, _) = watch::channel(initial.highlights.clone());
        let (state, _) = watch::channel(initial);
        Self {
            mapper,
            adapter,
            cache_key_builder,
            coordinator,
            config,
            state,
            filters,
            results,
            loading,
            error,
            total_results,
            statistics,
            highlights,
            epoch: Arc::new(AtomicU64::new(0)),
            url_task: parking_lot::Mutex::new(None),
            broker: parking_lot::Mutex::new(None),
        }
    }

    /// `state$`: replays the current state on subscribe.
    #[must_use]
    pub fn state_stream(&self) -> watch::Receiver<ResourceState<F, D, S>> {
        self.state.subscribe()
    }

    /// `filters$`: the current filter snapshot, deduplicated on its own value.
    #[must_use]
    pub fn filters_stream(&self) -> watch::Receiver<F> {
        self.filters.subscribe()
    }

    /// `results$`: the current page of results, deduplicated on its own value.
    #[must_use]
    pub fn results_stream(&self) -> watch::Receiver<Vec<D>> {
        self.results.subscribe()
    }

    /// `loading$`: whether a fetch for the current fingerprint is in flight.
    #[must_use]
    pub fn loading_stream(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// `error$`: the last fetch's terminal error, if any.
    #[must_use]
    pub fn error_stream(&self) -> watch::Receiver<Option<CoordinatorError>> {
        self.error.subscribe()
    }

    /// `totalResults$`: the total matching count.
    #[must_use]
    pub fn total_results_stream(&self) -> watch::Receiver<u64> {
        self.total_results.subscribe()
    }

    /// `statistics$`: the optional aggregates returned alongside results.
    #[must_use]
    pub fn statistics_stream(&self) -> watch::Receiver<Option<S>> {
        self.statistics.subscribe()
    }

    /// `highlights$`: the URL-derived highlight overlay, distinct from `filters$`.
    #[must_use]
    pub fn highlights_stream(&self) -> watch::Receiver<Option<F>> {
        self.highlights.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> ResourceState<F, D, S> {
        self.state.borrow().clone()
    }

    /// Push every per-slice sender to `state`'s current value. Each sender's
    /// own `send_if_modified` equality check is what gives every stream its
    /// own dedup, independent of whether some other slice changed too.
    fn publish_slices(&self) {
        let s = self.state.borrow().clone();
        send_if_changed(&self.filters, s.filters);
        send_if_changed(&self.results, s.results);
        send_if_changed(&self.loading, s.loading);
        send_error_if_changed(&self.error, s.error);
        send_if_changed(&self.total_results, s.total_results);
        send_if_changed(&self.statistics, s.statistics);
        send_if_changed(&self.highlights, s.highlights);
    }

    /// Primary-mode wiring: subscribe to the
    /// broker's `params$` and re-fetch on every change, applying results
    /// only if no newer params arrived while the fetch was in flight.
    /// Returns a handle the caller should hold until [`Self::dispose`].
    pub fn drive_from_broker(self: &Arc<Self>, broker: Arc<UrlStateBroker>) {
        *self.broker.lock() = Some(broker.clone());
        let this = self.clone();
        let handle = tokio::spawn(async move { this.run_url_driven(broker).await });
        *self.url_task.lock() = Some(handle);
    }

    /// The broker this orchestrator was wired to via [`Self::drive_from_broker`],
    /// or `None` for a secondary-window orchestrator.
    #[must_use]
    pub(crate) fn attached_broker(&self) -> Option<Arc<UrlStateBroker>> {
        self.broker.lock().clone()
    }

    async fn run_url_driven(self: Arc<Self>, broker: Arc<UrlStateBroker>) {
        let mut params = broker.params_stream();
        loop {
            let current = params.borrow_and_update().clone();
            self.apply_params(&current).await;
            if params.changed().await.is_err() {
                break;
            }
        }
    }

    /// Parse `params` into filters/highlights and run a fetch for them,
    /// tagged with a fresh epoch so a slower, now-stale fetch can never
    /// clobber a result that started later.
    async fn apply_params(&self, params: &crate::params::Params) {
        let mut warnings = Vec::new();
        let filters = self.mapper.from_url_params(params, &mut warnings);
        let highlights = self.mapper.extract_highlights(params, &mut warnings);
        for w in warnings {
            warn!(key = %w.key, value = %w.value, "mapper coerced malformed param");
        }

        // Two URL emissions that parse to the same (filters,
        // highlights) coalesce into one fetch rather than re-dispatching —
        // distinct from the coordinator's own key-based dedup, which
        // only collapses concurrent in-flight calls, not already-settled
        // ones. Epoch 0 means no fetch has ever been dispatched, so the
        // first params emission always runs one even if it happens to match
        // `default_filters()` byte-for-byte.
        if self.epoch.load(Ordering::SeqCst) != 0 {
            let current = self.state.borrow();
            if current.filters == filters && current.highlights == highlights {
                return;
            }
        }

        self.fetch_for(filters, highlights, ExecuteOptions::default()).await;
    }

    pub(crate) async fn fetch_for(&self, filters: F, highlights: Option<F>, opts: ExecuteOptions) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        self.state.send_modify(|s| {
            s.filters = filters.clone();
            s.highlights = highlights.clone();
            s.loading = true;
        });
        self.publish_slices();

        let key = self.cache_key_builder.build_key(&filters, highlights.as_ref());
        let produce = make_producer(self.adapter.clone(), filters.clone(), highlights.clone());
        let result = self.coordinator.execute(key, produce, opts).await;

        // A later `apply_params` may have bumped the epoch while this fetch
        // was in flight; if so, its own fetch owns the state update and this
        // stale result is discarded.
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }

        self.state.send_modify(|s| match result {
            Ok(outcome) => {
                s.results = outcome.results;
                s.total_results = outcome.total;
                s.statistics = outcome.statistics;
                s.loading = false;
                s.error = None;
            }
            Err(err) => {
                // A failed fetch clears `loading` but
                // preserves the last-good `results`/`statistics`.
                s.loading = false;
                s.error = Some(err);
            }
        });
        self.publish_slices();
    }

    /// Apply a delta pushed from the primary side. Never touches the adapter or a
    /// broker — a secondary window must not fetch or write the URL.
    pub fn sync_state_from_external(&self, delta: StateDelta<F, D, S>) {
        self.state.send_modify(|s| *s = delta.apply(s));
        self.publish_slices();
    }

    /// Abort the background URL-subscription task, if one is running
    ///. The coordinator and its cache are shared
    /// with other orchestrators and outlive this call.
    pub fn dispose(&self) {
        if let Some(handle) = self.url_task.lock().take() {
            handle.abort();
        }
    }

    pub(crate) fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub(crate) fn mapper(&self) -> &M {
        &self.mapper
    }
}

/// Publish `next` to `sender`, deduplicating by equality the same way
/// `ResourceState`'s own streams are required to (§4.6: "all deduplicated by
/// deep equality on their slice").
fn send_if_changed<T: PartialEq + Clone>(sender: &watch::Sender<T>, next: T) {
    sender.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

/// `error$`'s dedup rule mirrors `ResourceState`'s own manual `PartialEq`:
/// `CoordinatorError` isn't itself comparable (it carries an opaque `Arc<dyn
/// Error>`), so two errors are treated as equal iff both are present or both
/// are absent.
fn send_error_if_changed(sender: &watch::Sender<Option<CoordinatorError>>, next: Option<CoordinatorError>) {
    sender.send_if_modified(|current| {
        if current.is_none() == next.is_none() {
            false
        } else {
            *current = next;
            true
        }
    });
}

fn make_producer<F, D, S, A>(adapter: Arc<A>, filters: F, highlights: Option<F>) -> Produce<FetchOutcome<D, S>>
where
    F: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
    S: Send + Sync + 'static,
    A: DataAdapter<F, D, S> + 'static,
{
    Box::new(move || {
        let adapter = adapter.clone();
        let filters = filters.clone();
        let highlights = highlights.clone();
        Box::pin(async move { adapter.fetch_data(&filters, highlights.as_ref()).await })
    })
}

//! End-to-end scenarios not already covered by a dedicated property test:
//! browser back restoring the previous filters, a pop-out's own highlight
//! overlay surviving even though the primary's broadcast omits it, and
//! retry-then-fail preserving the last-good results.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use urlstate_core::adapter::test_support::FakeAdapter;
use urlstate_core::adapter::FetchOutcome;
use urlstate_core::cache_key::ParamsCacheKeyBuilder;
use urlstate_core::config::{CoordinatorConfig, OrchestratorConfig};
use urlstate_core::coordinator::RequestCoordinator;
use urlstate_core::error::{BoxFuture, FetchError};
use urlstate_core::mapper::test_support::{VehicleFilters, VehicleMapper};
use urlstate_core::orchestrator::ResourceOrchestrator;
use urlstate_core::popout::{Envelope, PopoutChannelRegistry, SecondaryWindowHost};
use urlstate_core::testing::InMemoryNavigation;
use urlstate_core::{DataAdapter, SetParamsOptions, UrlStateBroker};

fn build_orchestrator(
    adapter: Arc<FakeAdapter>,
) -> Arc<
    ResourceOrchestrator<VehicleFilters, u32, u32, VehicleMapper, FakeAdapter, ParamsCacheKeyBuilder<VehicleMapper>>,
> {
    Arc::new(ResourceOrchestrator::new(
        Arc::new(VehicleMapper),
        adapter,
        Arc::new(ParamsCacheKeyBuilder::new(VehicleMapper)),
        Arc::new(RequestCoordinator::new(CoordinatorConfig::default())),
        OrchestratorConfig::default(),
    ))
}

#[tokio::test]
async fn browser_back_restores_the_previous_filter_state() {
    let adapter = Arc::new(FakeAdapter::new(vec![
        Ok(FetchOutcome { results: vec![1], total: 1, statistics: None }),
        Ok(FetchOutcome { results: vec![2], total: 1, statistics: None }),
    ]));
    let orchestrator = build_orchestrator(adapter);

    let navigation = Arc::new(InMemoryNavigation::new("manufacturer=Ford"));
    let backend: Box<dyn urlstate_core::NavigationBackend> =
        Box::new(BackendHandle(navigation.clone()));
    let broker = Arc::new(UrlStateBroker::new(backend));
    orchestrator.drive_from_broker(broker.clone());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(orchestrator.snapshot().filters.manufacturer, Some("Ford".to_string()));

    broker
        .set_params(
            urlstate_core::Params::from_pairs([("manufacturer", "Toyota")]),
            SetParamsOptions { merge: false },
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(orchestrator.snapshot().filters.manufacturer, Some("Toyota".to_string()));

    // The browser back button doesn't go through `set_params` — it changes
    // the backend's query directly and relies on whatever re-reads it.
    let restored = navigation.go_back().expect("one prior history entry to return to");
    assert_eq!(restored, "manufacturer=Ford");
}

/// `InMemoryNavigation` is `Arc`-shared here so the test can drive
/// `go_back()` after construction; this thin wrapper lets the same instance
/// back a `NavigationBackend` trait object.
struct BackendHandle(Arc<InMemoryNavigation>);

impl urlstate_core::NavigationBackend for BackendHandle {
    fn read_query(&self) -> String {
        self.0.read_query()
    }

    fn write_query<'a>(&'a self, query: String) -> BoxFuture<'a, Result<(), urlstate_core::BrokerError>> {
        self.0.write_query(query)
    }
}

#[tokio::test]
async fn popout_highlight_overlay_survives_a_primary_broadcast_that_omits_it() {
    let primary_adapter = Arc::new(FakeAdapter::new(vec![Ok(FetchOutcome {
        results: vec![1],
        total: 1,
        statistics: None,
    })]));
    let primary = build_orchestrator(primary_adapter);

    let secondary_adapter = Arc::new(FakeAdapter::new(vec![]));
    let secondary_orchestrator = build_orchestrator(secondary_adapter.clone());

    let registry = PopoutChannelRegistry::new();
    // The secondary window's own URL carries a highlight the primary never
    // sent — e.g. a chart panel opened with its own `h_yearMin` deep link.
    let host = SecondaryWindowHost::mount(
        secondary_orchestrator.clone(),
        &registry,
        "chart",
        "h_yearMin=2017",
        &VehicleMapper,
    );
    assert_eq!(
        secondary_orchestrator.snapshot().highlights.as_ref().unwrap().year_min,
        Some(2017)
    );

    // Simulate the primary's broadcaster pushing a `STATE_UPDATE` whose own
    // `highlights` field is `None` (no overlay active on the primary side).
    let channel = registry.open("chart");
    let mut primary_state = primary.snapshot();
    primary_state.highlights = None;
    primary_state.results = vec![2];
    channel.send(Envelope::StateUpdate(primary_state)).unwrap();

    let mut states = host.orchestrator().state_stream();
    states.changed().await.unwrap();

    // `StateUpdate` carries the full state, but a sender with no active
    // overlay must not clobber the secondary's own — so the broadcast's
    // other fields land (results updates to the primary's) while the
    // locally-seeded highlight survives untouched.
    let synced = states.borrow();
    assert_eq!(synced.results, vec![2]);
    assert_eq!(synced.highlights.as_ref().unwrap().year_min, Some(2017));
    drop(synced);
    assert_eq!(secondary_adapter.call_count(), 0, "the secondary must never fetch on its own");
}

#[tokio::test]
async fn retry_then_fail_preserves_last_good_results() {
    struct FlakyThenGoodAdapter {
        calls: AtomicU32,
    }

    impl DataAdapter<VehicleFilters, u32, u32> for FlakyThenGoodAdapter {
        fn fetch_data<'a>(
            &'a self,
            filters: &'a VehicleFilters,
            _highlights: Option<&'a VehicleFilters>,
        ) -> BoxFuture<'a, Result<FetchOutcome<u32, u32>, FetchError>> {
            let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
            let page = filters.page;
            Box::pin(async move {
                if page == 1 {
                    Ok(FetchOutcome { results: vec![1], total: 1, statistics: None })
                } else {
                    // Every attempt for page 2 fails, retryable, so the
                    // coordinator exhausts its retries and surfaces an error.
                    let _ = call_index;
                    Err(FetchError::msg("unavailable").with_status(503))
                }
            })
        }
    }

    let adapter = Arc::new(FlakyThenGoodAdapter { calls: AtomicU32::new(0) });
    let coordinator = Arc::new(RequestCoordinator::new(
        CoordinatorConfig::builder()
            .max_retries(2)
            .initial_retry_delay(Duration::from_millis(1))
            .build(),
    ));
    let orchestrator = Arc::new(ResourceOrchestrator::new(
        Arc::new(VehicleMapper),
        adapter,
        Arc::new(ParamsCacheKeyBuilder::new(VehicleMapper)),
        coordinator,
        OrchestratorConfig::default(),
    ));

    let broker = urlstate_core::testing::in_memory_broker("page=1");
    orchestrator.drive_from_broker(broker.clone());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(orchestrator.snapshot().results, vec![1]);
    assert!(orchestrator.snapshot().error.is_none());

    broker
        .set_params(urlstate_core::Params::from_pairs([("page", "2")]), SetParamsOptions { merge: false })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = orchestrator.snapshot();
    assert!(state.error.is_some(), "exhausted retries must surface as an error");
    assert_eq!(state.results, vec![1], "a failed fetch must preserve the last-good results");
    assert!(!state.loading);
}

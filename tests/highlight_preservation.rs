//! The `h_*` highlight overlay survives `clearFilters()` (when the
//! orchestrator is configured to preserve it, the default) and survives a
//! `syncStateFromExternal` push independent of whatever the filters do.

use std::sync::Arc;
use std::time::Duration;

use urlstate_core::adapter::test_support::FakeAdapter;
use urlstate_core::adapter::FetchOutcome;
use urlstate_core::cache_key::ParamsCacheKeyBuilder;
use urlstate_core::config::{CoordinatorConfig, OrchestratorConfig};
use urlstate_core::coordinator::RequestCoordinator;
use urlstate_core::mapper::test_support::VehicleMapper;
use urlstate_core::orchestrator::ResourceOrchestrator;
use urlstate_core::testing::in_memory_broker;
use urlstate_core::FilterMapper;

fn build() -> (
    Arc<ResourceOrchestrator<
        urlstate_core::mapper::test_support::VehicleFilters,
        u32,
        u32,
        VehicleMapper,
        FakeAdapter,
        ParamsCacheKeyBuilder<VehicleMapper>,
    >>,
    Arc<FakeAdapter>,
) {
    let adapter = Arc::new(FakeAdapter::new(vec![]));
    let coordinator = Arc::new(RequestCoordinator::new(CoordinatorConfig::default()));
    let orchestrator = Arc::new(ResourceOrchestrator::new(
        Arc::new(VehicleMapper),
        adapter.clone(),
        Arc::new(ParamsCacheKeyBuilder::new(VehicleMapper)),
        coordinator,
        OrchestratorConfig::default(),
    ));
    (orchestrator, adapter)
}

#[tokio::test]
async fn clear_filters_preserves_highlights_by_default() {
    let (orchestrator, _adapter) = build();
    let broker = in_memory_broker("manufacturer=Ford&h_yearMin=2015");
    orchestrator.drive_from_broker(broker.clone());
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(orchestrator.snapshot().highlights.as_ref().unwrap().year_min, Some(2015));

    orchestrator.clear_filters().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let state = orchestrator.snapshot();
    assert_eq!(state.filters.manufacturer, None, "filters should reset to defaults");
    assert_eq!(
        state.highlights.as_ref().unwrap().year_min,
        Some(2015),
        "highlight overlay must survive clearFilters when preserve_highlights_on_clear is set"
    );
    assert!(broker.snapshot().get("h_yearMin").is_some());
    assert!(broker.snapshot().get("manufacturer").is_none());
}

#[tokio::test]
async fn clear_filters_wipes_highlights_when_disabled() {
    let adapter = Arc::new(FakeAdapter::new(vec![]));
    let coordinator = Arc::new(RequestCoordinator::new(CoordinatorConfig::default()));
    let config = OrchestratorConfig::builder().preserve_highlights_on_clear(false).build();
    let orchestrator = Arc::new(ResourceOrchestrator::new(
        Arc::new(VehicleMapper),
        adapter,
        Arc::new(ParamsCacheKeyBuilder::new(VehicleMapper)),
        coordinator,
        config,
    ));
    let broker = in_memory_broker("manufacturer=Ford&h_yearMin=2015");
    orchestrator.drive_from_broker(broker.clone());
    tokio::time::sleep(Duration::from_millis(10)).await;

    orchestrator.clear_filters().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(orchestrator.snapshot().highlights.is_none());
    assert!(broker.snapshot().is_empty());
}

#[tokio::test]
async fn sync_state_from_external_does_not_disturb_independently_seeded_highlights() {
    let (orchestrator, _adapter) = build();
    // No broker attached: this models a secondary window's orchestrator,
    // seeded once from its own query string and then only ever pushed to.
    let mut warnings = Vec::new();
    let highlights = VehicleMapper.from_url_params(
        &urlstate_core::Params::from_pairs([("yearMin", "2018")]),
        &mut warnings,
    );
    orchestrator.sync_state_from_external(urlstate_core::StateDelta {
        highlights: Some(Some(highlights)),
        ..Default::default()
    });
    assert_eq!(orchestrator.snapshot().highlights.as_ref().unwrap().year_min, Some(2018));

    // A subsequent full-state push (as the primary would broadcast) that
    // carries its own filters must not clobber the highlight slot it does
    // carry — from_full always sets every field, so the overlay it carries
    // wins, matching what the primary's own state actually contains.
    orchestrator.sync_state_from_external(urlstate_core::StateDelta::from_full(orchestrator.snapshot()));
    assert_eq!(orchestrator.snapshot().highlights.as_ref().unwrap().year_min, Some(2018));
}

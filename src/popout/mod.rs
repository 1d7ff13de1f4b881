//! Pop-out Context, Manager, and Secondary Window Host.

mod channel;
mod context;
mod envelope;
mod manager;
mod secondary;
mod window;

pub use channel::{PopoutChannel, PopoutChannelRegistry};
pub use context::{PanelRoute, PopoutContext};
pub use envelope::{Envelope, Message};
pub use manager::PopoutManager;
pub use secondary::SecondaryWindowHost;
pub use window::{WindowHandle, WindowOpener};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::FakeAdapter;
    use crate::cache_key::ParamsCacheKeyBuilder;
    use crate::config::{CoordinatorConfig, OrchestratorConfig, PopoutConfig};
    use crate::coordinator::RequestCoordinator;
    use crate::mapper::test_support::{VehicleFilters, VehicleMapper};
    use crate::orchestrator::ResourceOrchestrator;
    use crate::testing::in_memory_broker;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct FakeWindowHandle {
        closed: Arc<AtomicBool>,
    }

    impl WindowHandle for FakeWindowHandle {
        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
        fn focus(&self) {}
    }

    struct FakeWindowOpener {
        closed_flags: parking_lot::Mutex<Vec<Arc<AtomicBool>>>,
    }

    impl FakeWindowOpener {
        fn new() -> Self {
            Self { closed_flags: parking_lot::Mutex::new(Vec::new()) }
        }
    }

    impl WindowOpener for FakeWindowOpener {
        fn open(&self, _route: &str) -> Option<Box<dyn WindowHandle>> {
            let closed = Arc::new(AtomicBool::new(false));
            self.closed_flags.lock().push(closed.clone());
            Some(Box::new(FakeWindowHandle { closed }))
        }
    }

    type TestOrchestrator = ResourceOrchestrator<
        VehicleFilters,
        u32,
        u32,
        VehicleMapper,
        FakeAdapter,
        ParamsCacheKeyBuilder<VehicleMapper>,
    >;

    fn build_orchestrator() -> Arc<TestOrchestrator> {
        Arc::new(ResourceOrchestrator::new(
            Arc::new(VehicleMapper),
            Arc::new(FakeAdapter::new(vec![])),
            Arc::new(ParamsCacheKeyBuilder::new(VehicleMapper)),
            Arc::new(RequestCoordinator::new(CoordinatorConfig::default())),
            OrchestratorConfig::default(),
        ))
    }

    #[tokio::test]
    async fn panel_ready_triggers_immediate_state_update() {
        let orchestrator = build_orchestrator();
        let broker = in_memory_broker("manufacturer=Ford");
        orchestrator.drive_from_broker(broker.clone());
        tokio::time::sleep(Duration::from_millis(5)).await;

        let opener = Arc::new(FakeWindowOpener::new());
        let manager = PopoutManager::new(
            "grid-1",
            orchestrator.clone(),
            broker,
            opener.clone(),
            PopoutConfig::default(),
        );
        manager.open("stats", "chart").unwrap();

        let host = SecondaryWindowHost::mount(
            build_orchestrator(),
            manager.channel_registry(),
            "stats",
            "",
            &VehicleMapper,
        );
        let mut states = host.orchestrator().state_stream();
        states.changed().await.unwrap();
        assert_eq!(states.borrow().filters.manufacturer, Some("Ford".to_string()));
    }

    #[tokio::test]
    async fn filter_add_from_secondary_updates_primary_url_and_both_states() {
        let orchestrator = build_orchestrator();
        let broker = in_memory_broker("manufacturer=Ford");
        orchestrator.drive_from_broker(broker.clone());
        tokio::time::sleep(Duration::from_millis(5)).await;

        let opener = Arc::new(FakeWindowOpener::new());
        let manager =
            PopoutManager::new("grid-1", orchestrator.clone(), broker.clone(), opener, PopoutConfig::default());
        manager.open("stats", "chart").unwrap();

        let host = SecondaryWindowHost::mount(
            build_orchestrator(),
            manager.channel_registry(),
            "stats",
            "",
            &VehicleMapper,
        );
        // Drain the PANEL_READY-triggered STATE_UPDATE before exercising the intent.
        let mut host_states = host.orchestrator().state_stream();
        host_states.changed().await.unwrap();

        host.send_intent(Envelope::FilterAdd { field: "bodyClass".to_string(), value: "SUV".to_string() })
            .unwrap();

        host_states.changed().await.unwrap();
        assert_eq!(host_states.borrow().filters.body_classes, vec!["SUV".to_string()]);
        assert_eq!(broker.snapshot().get("bodyClass"), Some("SUV"));
        // Only the primary's orchestrator adapter saw a call; the secondary
        // never fetches.
    }

    #[tokio::test]
    async fn liveness_poll_clears_registry_entry_once_window_closes() {
        let orchestrator = build_orchestrator();
        let broker = in_memory_broker("");
        let opener = Arc::new(FakeWindowOpener::new());
        let manager = PopoutManager::new(
            "grid-1",
            orchestrator,
            broker,
            opener.clone(),
            PopoutConfig { liveness_poll_interval: Duration::from_millis(5) },
        );
        manager.open("stats", "chart").unwrap();
        opener.closed_flags.lock()[0].store(true, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(30)).await;
        // Re-opening after the handle reports closed must open a fresh window
        // rather than silently no-op on a stale live entry.
        manager.open("stats", "chart").unwrap();
        assert_eq!(opener.closed_flags.lock().len(), 2);
    }
}

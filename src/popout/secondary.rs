//! Secondary Window Host: never fetches, never writes the URL.

use super::channel::{PopoutChannel, PopoutChannelRegistry};
use super::envelope::Envelope;
use crate::adapter::DataAdapter;
use crate::cache_key::CacheKeyBuilder;
use crate::mapper::FilterMapper;
use crate::orchestrator::ResourceOrchestrator;
use crate::params::Params;
use crate::state::StateDelta;
use std::sync::Arc;

/// Mounted in a pop-out window. Holds an orchestrator that was never handed
/// a broker, and a
/// channel to the primary that's the only way its state ever changes.
pub struct SecondaryWindowHost<F, D, S, M, A, K> {
    orchestrator: Arc<ResourceOrchestrator<F, D, S, M, A, K>>,
    channel: PopoutChannel<F, D, S>,
}

impl<F, D, S, M, A, K> SecondaryWindowHost<F, D, S, M, A, K>
where
    F: Clone + PartialEq + Send + Sync + 'static,
    D: Clone + PartialEq + Send + Sync + 'static,
    S: Clone + PartialEq + Send + Sync + 'static,
    M: FilterMapper<F> + 'static,
    A: DataAdapter<F, D, S> + 'static,
    K: CacheKeyBuilder<F> + 'static,
{
    /// `mount`: open the channel, seed the initial highlight
    /// overlay from this window's own URL, subscribe to
    /// `STATE_UPDATE`, then announce readiness.
    pub fn mount(
        orchestrator: Arc<ResourceOrchestrator<F, D, S, M, A, K>>,
        registry: &PopoutChannelRegistry<F, D, S>,
        panel_id: &str,
        initial_query: &str,
        mapper: &M,
    ) -> Self {
        let channel = registry.open(panel_id);
        let host = Self { orchestrator: orchestrator.clone(), channel: channel.clone() };

        let params = Params::parse_query(initial_query);
        let mut warnings = Vec::new();
        if let Some(highlights) = mapper.extract_highlights(&params, &mut warnings) {
            orchestrator.sync_state_from_external(StateDelta { highlights: Some(Some(highlights)), ..Default::default() });
        }

        host.spawn_inbound_listener();
        let _ = channel.send(Envelope::PanelReady);
        host
    }

    fn spawn_inbound_listener(&self) {
        let orchestrator = self.orchestrator.clone();
        let mut rx = self.channel.subscribe();
        tokio::spawn(async move {
            loop {
                if rx.changed().await.is_err() {
                    break;
                }
                let Some(message) = rx.borrow_and_update().clone() else { continue };
                if let Envelope::StateUpdate(state) = message.envelope {
                    orchestrator.sync_state_from_external(StateDelta::from_full(state));
                }
                // ClosePopout is left for the embedding window shell to act
                // on.
            }
        });
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Arc<ResourceOrchestrator<F, D, S, M, A, K>> {
        &self.orchestrator
    }

    /// Send a user intent upstream to the primary.
    pub fn send_intent(&self, envelope: Envelope<F, D, S>) -> Result<(), crate::error::PopoutError> {
        self.channel.send(envelope)
    }
}

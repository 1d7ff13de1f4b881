//! Pop-out Manager, the primary side of the pop-out protocol.

use super::channel::{PopoutChannel, PopoutChannelRegistry};
use super::envelope::Envelope;
use super::window::{WindowHandle, WindowOpener};
use crate::adapter::DataAdapter;
use crate::broker::{SetParamsOptions, UrlStateBroker};
use crate::cache_key::CacheKeyBuilder;
use crate::config::PopoutConfig;
use crate::error::PopoutError;
use crate::mapper::FilterMapper;
use crate::orchestrator::ResourceOrchestrator;
use crate::params::{HIGHLIGHT_PREFIX, Params};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

struct PanelHandle<F, D, S> {
    handle: Box<dyn WindowHandle>,
    channel: PopoutChannel<F, D, S>,
}

/// Opens pop-out windows, tracks their liveness, broadcasts state, and
/// routes inbound secondary-window intents to the URL broker.
///
/// The manager itself performs no URL writes directly — every inbound
/// intent is funnelled through `UrlStateBroker` or the orchestrator's intent
/// methods, which are themselves the only things that touch the broker.
pub struct PopoutManager<F, D, S, M, A, K> {
    grid_id: String,
    registry: PopoutChannelRegistry<F, D, S>,
    orchestrator: Arc<ResourceOrchestrator<F, D, S, M, A, K>>,
    broker: Arc<UrlStateBroker>,
    window_opener: Arc<dyn WindowOpener>,
    panels: Arc<DashMap<String, PanelHandle<F, D, S>>>,
    config: PopoutConfig,
}

impl<F, D, S, M, A, K> PopoutManager<F, D, S, M, A, K>
where
    F: Clone + PartialEq + Send + Sync + 'static,
    D: Clone + PartialEq + Send + Sync + 'static,
    S: Clone + PartialEq + Send + Sync + 'static,
    M: FilterMapper<F> + 'static,
    A: DataAdapter<F, D, S> + 'static,
    K: CacheKeyBuilder<F> + 'static,
{
    #[must_use]
    pub fn new(
        grid_id: impl Into<String>,
        orchestrator: Arc<ResourceOrchestrator<F, D, S, M, A, K>>,
        broker: Arc<UrlStateBroker>,
        window_opener: Arc<dyn WindowOpener>,
        config: PopoutConfig,
    ) -> Arc<Self> {
        let manager = Arc::new(Self {
            grid_id: grid_id.into(),
            registry: PopoutChannelRegistry::new(),
            orchestrator,
            broker,
            window_opener,
            panels: Arc::new(DashMap::new()),
            config,
        });
        manager.clone().spawn_state_broadcaster();
        manager
    }

    fn spawn_state_broadcaster(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut states = self.orchestrator.state_stream();
            loop {
                let snapshot = states.borrow_and_update().clone();
                self.broadcast(&snapshot);
                if states.changed().await.is_err() {
                    break;
                }
            }
        });
    }

    /// `open(panelId, panelType)`. Focuses the existing window
    /// instead of opening a second one if `panel_id` is already registered
    /// and its handle is still live.
    pub fn open(&self, panel_id: &str, panel_type: &str) -> Result<(), PopoutError> {
        if let Some(existing) = self.panels.get(panel_id) {
            if !existing.handle.is_closed() {
                existing.handle.focus();
                return Ok(());
            }
        }

        let route = format!("/panel/{}/{}/{}", self.grid_id, panel_id, panel_type);
        let handle = self
            .window_opener
            .open(&route)
            .ok_or_else(|| PopoutError::PopupBlocked(panel_id.to_string()))?;
        let channel = self.registry.open(panel_id);

        self.panels.insert(panel_id.to_string(), PanelHandle { handle, channel: channel.clone() });
        self.spawn_liveness_poll(panel_id.to_string());
        self.spawn_inbound_router(panel_id.to_string(), channel);
        Ok(())
    }

    /// The channel registry backing this manager. Visible within the
    /// `popout` module only — tests construct a secondary host against the
    /// same registry a real composition root would pass to both sides.
    pub(in crate::popout) fn channel_registry(&self) -> &PopoutChannelRegistry<F, D, S> {
        &self.registry
    }

    /// Explicitly close a registered pop-out, notifying the secondary side.
    pub fn close(&self, panel_id: &str) {
        if let Some((_, panel)) = self.panels.remove(panel_id) {
            let _ = panel.channel.send(Envelope::ClosePopout);
        }
        self.registry.close(panel_id);
    }

    /// `broadcast(state)`: post `STATE_UPDATE` to every registered channel.
    pub fn broadcast(&self, state: &crate::state::ResourceState<F, D, S>) {
        for entry in self.panels.iter() {
            let _ = entry.value().channel.send(Envelope::StateUpdate(state.clone()));
        }
    }

    fn spawn_liveness_poll(&self, panel_id: String) {
        let panels = self.panels.clone();
        let registry = self.registry.clone();
        let interval = self.config.liveness_poll_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let closed = match panels.get(&panel_id) {
                    Some(entry) => entry.handle.is_closed(),
                    None => return,
                };
                if closed {
                    debug!(panel_id, "pop-out window closed, clearing registry entry");
                    panels.remove(&panel_id);
                    registry.close(&panel_id);
                    return;
                }
            }
        });
    }

    fn spawn_inbound_router(&self, panel_id: String, channel: PopoutChannel<F, D, S>) {
        let orchestrator = self.orchestrator.clone();
        let broker = self.broker.clone();
        // Subscribed before the panel's handle/channel are visible to any
        // other task, so the secondary side's first `PanelReady` can never
        // race ahead of this router's subscription (mirrors secondary.rs).
        let mut rx = channel.subscribe();
        tokio::spawn(async move {
            loop {
                if rx.changed().await.is_err() {
                    break;
                }
                let Some(message) = rx.borrow_and_update().clone() else { continue };
                route_inbound(&orchestrator, &broker, &channel, panel_id.clone(), message.envelope).await;
            }
        });
    }
}

/// The inbound-routing table.
async fn route_inbound<F, D, S, M, A, K>(
    orchestrator: &Arc<ResourceOrchestrator<F, D, S, M, A, K>>,
    broker: &Arc<UrlStateBroker>,
    channel: &PopoutChannel<F, D, S>,
    panel_id: String,
    envelope: Envelope<F, D, S>,
) where
    F: Clone + PartialEq + Send + Sync + 'static,
    D: Clone + PartialEq + Send + Sync + 'static,
    S: Clone + PartialEq + Send + Sync + 'static,
    M: FilterMapper<F> + 'static,
    A: DataAdapter<F, D, S> + 'static,
    K: CacheKeyBuilder<F> + 'static,
{
    let result = match envelope {
        Envelope::PanelReady => channel.send(Envelope::StateUpdate(orchestrator.snapshot())),
        Envelope::UrlParamsChanged { params } => {
            broker.set_params(params, SetParamsOptions { merge: true }).await.map_err(Into::into)
        }
        Envelope::FilterAdd { field, value } => {
            let current = broker.snapshot();
            let next = current.merged_with(&Params::from_pairs([(field, value)]));
            broker.set_params(next, SetParamsOptions { merge: false }).await.map_err(Into::into)
        }
        Envelope::FilterRemove { field } => {
            broker.clear_params(Some(&[field.as_str()])).await.map_err(Into::into)
        }
        Envelope::HighlightRemove { key } => {
            let key = format!("{HIGHLIGHT_PREFIX}{key}");
            broker.clear_params(Some(&[key.as_str()])).await.map_err(Into::into)
        }
        Envelope::ClearHighlights => {
            let current = broker.snapshot();
            let keys: Vec<String> =
                current.highlight_keys().map(|(k, _)| format!("{HIGHLIGHT_PREFIX}{k}")).collect();
            let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            broker.clear_params(Some(&key_refs)).await.map_err(Into::into)
        }
        Envelope::ClearAllFilters => broker.clear_params(None).await.map_err(Into::into),
        Envelope::PickerSelectionChange { url_param, value } => broker
            .set_params(Params::from_pairs([(url_param, value)]), SetParamsOptions { merge: true })
            .await
            .map_err(Into::into),
        Envelope::ChartClick { url_param, value, highlight_mode } => {
            let key = if highlight_mode { format!("{HIGHLIGHT_PREFIX}{url_param}") } else { url_param };
            broker
                .set_params(Params::from_pairs([(key, value)]), SetParamsOptions { merge: true })
                .await
                .map_err(Into::into)
        }
        // Primary never receives its own outbound-only message types.
        Envelope::StateUpdate(_) | Envelope::UrlParamsSync { .. } | Envelope::ClosePopout => Ok(()),
    };

    if let Err(err) = result {
        warn!(panel_id, %err, "pop-out inbound routing failed");
    }
}

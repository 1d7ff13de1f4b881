//! Pop-out Context: role detection from route shape, plus the `send`/
//! `messages` surface a mounted panel uses to talk to its channel without
//! holding onto a `PopoutChannelRegistry` handle itself.

use super::channel::PopoutChannelRegistry;
use super::envelope::{Envelope, Message};
use crate::error::PopoutError;
use tokio::sync::watch;

/// A parsed `/panel/<gridId>/<panelId>/<panelType>` route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelRoute {
    pub grid_id: String,
    pub panel_id: String,
    pub panel_type: String,
}

impl PanelRoute {
    /// Parse a path, returning `None` for anything that isn't exactly four
    /// non-empty `/`-delimited segments starting with `panel`.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let mut segments = path.trim_start_matches('/').split('/');
        match (segments.next(), segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some("panel"), Some(grid_id), Some(panel_id), Some(panel_type), None)
                if !grid_id.is_empty() && !panel_id.is_empty() && !panel_type.is_empty() =>
            {
                Some(Self {
                    grid_id: grid_id.to_string(),
                    panel_id: panel_id.to_string(),
                    panel_type: panel_type.to_string(),
                })
            }
            _ => None,
        }
    }
}

/// Role-detection helper: whether the current window is a pop-out.
#[derive(Clone, Debug)]
pub struct PopoutContext {
    route: Option<PanelRoute>,
}

impl PopoutContext {
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        Self { route: PanelRoute::parse(path) }
    }

    #[must_use]
    pub fn is_secondary(&self) -> bool {
        self.route.is_some()
    }

    #[must_use]
    pub fn current(&self) -> Option<&PanelRoute> {
        self.route.as_ref()
    }

    /// Post `envelope` on this panel's channel. `registry` is the same
    /// registry both the manager and the secondary host were built against —
    /// the context itself holds only the route, not a channel handle, so it
    /// looks the channel up fresh on every call rather than caching one.
    ///
    /// Errs with [`PopoutError::UnknownPanel`] if this context was built from
    /// a primary (non-panel) path.
    pub fn send<F, D, S>(
        &self,
        registry: &PopoutChannelRegistry<F, D, S>,
        envelope: Envelope<F, D, S>,
    ) -> Result<(), PopoutError>
    where
        F: Clone + Send + Sync + 'static,
        D: Clone + Send + Sync + 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = self.route.as_ref().ok_or_else(|| PopoutError::UnknownPanel("<primary>".to_string()))?;
        registry.open(&route.panel_id).send(envelope)
    }

    /// Subscribe to this panel's inbound replay-1 stream. Returns `None` for
    /// a primary context, since there's no panel channel to subscribe to.
    #[must_use]
    pub fn messages<F, D, S>(
        &self,
        registry: &PopoutChannelRegistry<F, D, S>,
    ) -> Option<watch::Receiver<Option<Message<F, D, S>>>>
    where
        F: Clone + Send + Sync + 'static,
        D: Clone + Send + Sync + 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = self.route.as_ref()?;
        Some(registry.open(&route.panel_id).subscribe())
    }
}

//! The broadcast message envelope.

use crate::params::Params;
use crate::state::ResourceState;
use std::time::{SystemTime, UNIX_EPOCH};

/// `{ type, payload?, timestamp }`, with `type`+`payload` folded into
/// one Rust enum per variant rather than carried as a separate tag string.
#[derive(Clone, Debug)]
pub enum Envelope<F, D, S> {
    /// secondary → primary, no payload.
    PanelReady,
    /// primary → secondary, the full state snapshot.
    StateUpdate(ResourceState<F, D, S>),
    /// primary → secondary, optional convenience alongside `StateUpdate`.
    UrlParamsSync { params: Params },
    /// secondary → primary.
    UrlParamsChanged { params: Params },
    /// secondary → primary.
    FilterAdd { field: String, value: String },
    /// secondary → primary.
    FilterRemove { field: String },
    /// secondary → primary.
    HighlightRemove { key: String },
    /// secondary → primary, no payload.
    ClearHighlights,
    /// secondary → primary, no payload.
    ClearAllFilters,
    /// secondary → primary.
    PickerSelectionChange { url_param: String, value: String },
    /// secondary → primary.
    ChartClick { url_param: String, value: String, highlight_mode: bool },
    /// primary → secondary, no payload.
    ClosePopout,
}

/// A timestamped envelope, the unit actually carried on a [`super::channel::PopoutChannel`].
#[derive(Clone, Debug)]
pub struct Message<F, D, S> {
    pub envelope: Envelope<F, D, S>,
    pub timestamp_ms: u64,
}

impl<F, D, S> Message<F, D, S> {
    #[must_use]
    pub fn now(envelope: Envelope<F, D, S>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { envelope, timestamp_ms }
    }
}

//! The cross-window channel abstraction: both a primary and a secondary
//! window open the same named channel (`panel-<panelId>`) and exchange
//! envelopes over it.
//!
//! Backed by `tokio::sync::watch` rather than `broadcast`, since a late
//! subscriber needs to immediately observe whatever was last sent rather
//! than wait for the next message — a replay-1 stream, not a backlog.

use super::envelope::{Envelope, Message};
use crate::error::PopoutError;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;

fn channel_name(panel_id: &str) -> String {
    format!("panel-{panel_id}")
}

/// A single named channel both the primary and a secondary window hold a
/// handle to.
pub struct PopoutChannel<F, D, S> {
    name: String,
    sender: watch::Sender<Option<Message<F, D, S>>>,
}

impl<F, D, S> Clone for PopoutChannel<F, D, S> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), sender: self.sender.clone() }
    }
}

impl<F, D, S> PopoutChannel<F, D, S>
where
    F: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    /// Post `envelope` to this channel. Only fails if every handle to this
    /// channel (both sides) has already been dropped.
    pub fn send(&self, envelope: Envelope<F, D, S>) -> Result<(), PopoutError> {
        self.sender
            .send(Some(Message::now(envelope)))
            .map_err(|_| PopoutError::UnknownPanel(self.name.clone()))
    }

    /// Subscribe to inbound messages. The new receiver immediately observes
    /// whatever was last sent, per the replay-1 shape.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Message<F, D, S>>> {
        self.sender.subscribe()
    }
}

/// Process-wide registry of open pop-out channels, keyed by `panelId`.
pub struct PopoutChannelRegistry<F, D, S> {
    channels: Arc<DashMap<String, watch::Sender<Option<Message<F, D, S>>>>>,
}

impl<F, D, S> Default for PopoutChannelRegistry<F, D, S> {
    fn default() -> Self {
        Self { channels: Arc::new(DashMap::new()) }
    }
}

impl<F, D, S> Clone for PopoutChannelRegistry<F, D, S> {
    fn clone(&self) -> Self {
        Self { channels: self.channels.clone() }
    }
}

impl<F, D, S> PopoutChannelRegistry<F, D, S>
where
    F: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or join, if already open) the channel for `panel_id`. Both the
    /// primary and the secondary call this with the same `panel_id` and get
    /// handles to the same underlying channel.
    pub fn open(&self, panel_id: &str) -> PopoutChannel<F, D, S> {
        let sender = self
            .channels
            .entry(channel_name(panel_id))
            .or_insert_with(|| watch::channel(None).0)
            .clone();
        PopoutChannel { name: channel_name(panel_id), sender }
    }

    /// Drop the registry's handle to `panel_id`'s channel, disposing it on
    /// close. Any side still holding a [`PopoutChannel`] clone can keep
    /// using it; only re-`open`ing after this returns a fresh channel.
    pub fn close(&self, panel_id: &str) {
        self.channels.remove(&channel_name(panel_id));
    }
}

//! Crate-wide error and future-boxing helpers.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, pinned future, the shape every trait-object seam in this crate
/// returns instead of relying on `async fn` in traits (which isn't object-safe).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque, cloneable error produced by a [`crate::adapter::DataAdapter`].
///
/// Wrapping in `Arc` lets the coordinator hand the same failure to every
/// subscriber of a shared in-flight request without requiring the adapter's
/// concrete error type to implement `Clone`. An optional HTTP status travels
/// alongside so the coordinator's retry policy can classify the
/// failure without depending on any particular HTTP client crate.
#[derive(Clone)]
pub struct FetchError {
    inner: Arc<dyn std::error::Error + Send + Sync + 'static>,
    status: Option<u16>,
    transport: bool,
}

impl FetchError {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self {
            inner: Arc::new(err),
            status: None,
            transport: false,
        }
    }

    pub fn msg(text: impl Into<String>) -> Self {
        Self::new(MessageError(text.into()))
    }

    /// Mark this failure as transport-class (connection refused, timeout, …).
    #[must_use]
    pub fn as_transport(mut self) -> Self {
        self.transport = true;
        self
    }

    /// Attach the HTTP status this failure carried, if any.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        self.status
    }

    /// True when the coordinator should treat this as transport-class,
    /// independent of any HTTP status.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        self.transport
    }
}

impl fmt::Debug for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MessageError {}

/// Errors raised by the URL state broker.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("navigation backend rejected the write: {0}")]
    NavigationFailed(String),
    #[error("the url state broker has been disposed")]
    Disposed,
}

/// Errors surfaced by the request coordinator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("the in-flight request was cancelled before it completed")]
    Cancelled,
}

/// Errors raised while opening or routing through a pop-out channel.
#[derive(Debug, thiserror::Error)]
pub enum PopoutError {
    #[error("popup blocked for panel {0}")]
    PopupBlocked(String),
    #[error("panel {0} is already registered and its window is still live")]
    AlreadyOpen(String),
    #[error("no registered channel for panel {0}")]
    UnknownPanel(String),
    #[error("malformed broadcast envelope: {0}")]
    MalformedEnvelope(String),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Errors surfaced by intent methods on the resource orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Broker(#[from] BrokerError),
    /// Raised by an intent method (`update_filters`, `refresh`, …) on an
    /// orchestrator that was never wired to a broker via `drive_from_broker` —
    /// i.e. a secondary window's orchestrator, which may only be driven
    /// through `sync_state_from_external`.
    #[error("orchestrator has no attached url broker; it is not in primary mode")]
    NotAttachedToBroker,
}

/// Non-fatal warning raised when [`crate::mapper::FilterMapper::from_url_params`]
/// coerces an invalid value to a default.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parameter {key} had an invalid value {value:?}, coerced to default")]
pub struct MapperWarning {
    pub key: String,
    pub value: String,
}

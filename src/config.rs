//! Tunables for the coordinator, orchestrator, and pop-out manager.
//!
//! A plain fluent builder with sensible `Default`s over each struct, since
//! none of this crate's config fields are mandatory — every one of them has
//! a documented default.

use std::time::Duration;

/// Tuning for the request coordinator.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// How long a successful payload stays fresh in the cache. Default 30s.
    pub cache_ttl: Duration,
    /// Maximum retry attempts after the first try. Default 3.
    pub max_retries: u32,
    /// Delay before the first retry; each subsequent retry doubles it. Default 1000ms.
    pub initial_retry_delay: Duration,
    /// Upper bound applied to the computed backoff delay regardless of attempt count.
    pub max_retry_delay: Duration,
    /// Randomization applied to each backoff delay, as a fraction (0.0-1.0) of
    /// the computed delay. Zero by default so coordinator tests stay
    /// deterministic; production callers typically apply around ±20% jitter.
    pub retry_jitter: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            max_retries: 3,
            initial_retry_delay: Duration::from_millis(1000),
            max_retry_delay: Duration::from_secs(30),
            retry_jitter: 0.0,
        }
    }
}

impl CoordinatorConfig {
    #[must_use]
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::default()
    }
}

/// Fluent builder over [`CoordinatorConfig`].
#[derive(Clone, Debug, Default)]
pub struct CoordinatorConfigBuilder {
    config: CoordinatorConfig,
}

impl CoordinatorConfigBuilder {
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    #[must_use]
    pub fn initial_retry_delay(mut self, delay: Duration) -> Self {
        self.config.initial_retry_delay = delay;
        self
    }

    #[must_use]
    pub fn max_retry_delay(mut self, delay: Duration) -> Self {
        self.config.max_retry_delay = delay;
        self
    }

    #[must_use]
    pub fn retry_jitter(mut self, jitter: f64) -> Self {
        self.config.retry_jitter = jitter.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn build(self) -> CoordinatorConfig {
        self.config
    }
}

/// Tuning for the resource orchestrator, including whether
/// `clear_filters()` preserves `h_*` params.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// When `true` (the default this crate picks, see DESIGN.md),
    /// `clear_filters()` keeps the current highlight overlay instead of
    /// wiping it along with the filters.
    pub preserve_highlights_on_clear: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { preserve_highlights_on_clear: true }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    #[must_use]
    pub fn preserve_highlights_on_clear(mut self, preserve: bool) -> Self {
        self.config.preserve_highlights_on_clear = preserve;
        self
    }

    #[must_use]
    pub fn build(self) -> OrchestratorConfig {
        self.config
    }
}

/// Tuning for the pop-out manager's liveness polling.
#[derive(Clone, Debug)]
pub struct PopoutConfig {
    /// How often the primary polls a registered window for closure. Default 500ms.
    pub liveness_poll_interval: Duration,
}

impl Default for PopoutConfig {
    fn default() -> Self {
        Self { liveness_poll_interval: Duration::from_millis(500) }
    }
}

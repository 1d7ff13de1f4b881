//! A domain-agnostic, URL-first reactive state core for browser-hosted
//! discovery applications: a single address bar drives a generic
//! `(Filters, Data, Statistics)` state machine, with an optional pop-out
//! window architecture layered on top of the same URL and state streams.
//!
//! The crate is organized around the nine collaborating pieces the rest of
//! the modules document individually:
//!
//! - [`coordinator`] — TTL cache, in-flight request dedup, retry+backoff.
//! - [`broker`] — the single writer/reader of the browser address bar.
//! - [`mapper`] — bidirectional `Filters <-> Params` conversion, per domain.
//! - [`adapter`] — `(Filters, Highlights) -> fetch`, per domain.
//! - [`cache_key`] — deterministic `(Filters, Highlights)` fingerprinting.
//! - [`orchestrator`] — the generic `(Filters, Data, Statistics)` state machine.
//! - [`popout`] — pop-out window role detection, management, and hosting.
//! - [`params`] / [`state`] / [`config`] / [`error`] — shared value types.
//!
//! A domain plugs in by implementing [`mapper::FilterMapper`],
//! [`adapter::DataAdapter`], and [`cache_key::CacheKeyBuilder`] over its own
//! `Filters`/`Data`/`Statistics` types; everything else is reused as-is.

pub mod adapter;
pub mod broker;
pub mod cache_key;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod mapper;
pub mod orchestrator;
pub mod params;
pub mod popout;
pub mod state;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use adapter::{DataAdapter, FetchOutcome};
pub use broker::{NavigationBackend, SetParamsOptions, UrlStateBroker};
pub use cache_key::{CacheKeyBuilder, ParamsCacheKeyBuilder};
pub use config::{CoordinatorConfig, OrchestratorConfig, PopoutConfig};
pub use coordinator::{ExecuteOptions, RequestCoordinator};
pub use error::{BrokerError, CoordinatorError, FetchError, MapperWarning, OrchestratorError, PopoutError};
pub use mapper::FilterMapper;
pub use orchestrator::{Intent, ResourceOrchestrator};
pub use params::Params;
pub use popout::{PanelRoute, PopoutChannelRegistry, PopoutContext, PopoutManager, SecondaryWindowHost};
pub use state::{Highlights, ResourceState, StateDelta};

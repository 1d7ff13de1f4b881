//! The address-bar primitive the URL state broker sits on top of.
//!
//! "DOM/window management" is treated as an assumed primitive; this trait is
//! the seam where that primitive enters the core. A real binding (e.g. over
//! `web_sys::window().history()`) lives outside this crate; what ships here
//! is the trait plus an in-memory implementation for tests and non-browser
//! hosts (`crate::testing::InMemoryNavigation`).

use crate::error::{BoxFuture, BrokerError};

/// The only interface [`super::broker::UrlStateBroker`] talks to. Every
/// other component that needs to change the URL goes through the broker's
/// `set_params`/`clear_params` instead of holding one of these directly —
/// that's the navigation-encapsulation invariant, checked in
/// `tests/navigation_encapsulation.rs`.
pub trait NavigationBackend: Send + Sync {
    /// Synchronously read the current query string (without the leading `?`).
    fn read_query(&self) -> String;

    /// Write a new query string. Asynchronous because a real binding awaits
    /// a navigation tick before the change is observable (a suspension
    /// point (a)).
    fn write_query<'a>(&'a self, query: String) -> BoxFuture<'a, Result<(), BrokerError>>;
}

//! Shared test doubles used across this crate's unit and integration tests.
//!
//! Kept behind `#[cfg(test)]` at the crate root (`pub(crate) mod testing`)
//! rather than as a dev-dependency-only `tests/common/mod.rs`, since these
//! fakes are also reused by unit tests living inside `src/`, alongside the
//! small inline fakes individual modules keep for themselves.

use crate::error::{BoxFuture, BrokerError};
use crate::broker::NavigationBackend;
use parking_lot::Mutex;
use std::sync::Arc;

/// An in-memory stand-in for the browser address bar. Construction seeds
/// the "current URL"; every write is recorded in `history` for assertions
/// like "back/forward restores the previous filters".
pub struct InMemoryNavigation {
    current: Mutex<String>,
    pub history: Mutex<Vec<String>>,
}

impl InMemoryNavigation {
    #[must_use]
    pub fn new(initial_query: impl Into<String>) -> Self {
        let initial = initial_query.into();
        Self {
            history: Mutex::new(vec![initial.clone()]),
            current: Mutex::new(initial),
        }
    }

    #[must_use]
    pub fn boxed(initial_query: impl Into<String>) -> Box<dyn NavigationBackend> {
        Box::new(Self::new(initial_query))
    }

    /// Simulate the browser back button by restepping to the previous entry.
    pub fn go_back(&self) -> Option<String> {
        let mut history = self.history.lock();
        if history.len() < 2 {
            return None;
        }
        history.pop();
        let previous = history.last().cloned()?;
        *self.current.lock() = previous.clone();
        Some(previous)
    }
}

impl NavigationBackend for InMemoryNavigation {
    fn read_query(&self) -> String {
        self.current.lock().clone()
    }

    fn write_query<'a>(&'a self, query: String) -> BoxFuture<'a, Result<(), BrokerError>> {
        Box::pin(async move {
            *self.current.lock() = query.clone();
            self.history.lock().push(query);
            Ok(())
        })
    }
}

/// Signature `Arc`-wrapping helper, since most orchestrator wiring wants
/// `Arc<dyn NavigationBackend>`-shaped construction but `UrlStateBroker::new`
/// takes an owned `Box`.
pub fn in_memory_broker(initial_query: impl Into<String>) -> Arc<crate::broker::UrlStateBroker> {
    Arc::new(crate::broker::UrlStateBroker::new(InMemoryNavigation::boxed(initial_query)))
}

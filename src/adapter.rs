//! The Data Adapter interface.

use crate::error::{BoxFuture, FetchError};

/// What a successful fetch produces: the current page of results, the total
/// matching count, and optional aggregate statistics.
#[derive(Clone, Debug)]
pub struct FetchOutcome<D, S> {
    pub results: Vec<D>,
    pub total: u64,
    pub statistics: Option<S>,
}

/// `(Filters, Highlights) -> fetch`.
///
/// Implementations MUST be referentially transparent in `(filters,
/// highlights)`: two calls with deep-equal arguments may be collapsed by the
/// request coordinator, so a `DataAdapter` must not depend on anything
/// outside its arguments to decide what to return.
///
/// Returns a boxed future rather than using `async fn` in the trait so the
/// orchestrator can hold `Arc<dyn DataAdapter<F, D, S>>` as a trait object.
pub trait DataAdapter<F, D, S>: Send + Sync {
    fn fetch_data<'a>(
        &'a self,
        filters: &'a F,
        highlights: Option<&'a F>,
    ) -> BoxFuture<'a, Result<FetchOutcome<D, S>, FetchError>>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_support {
    use super::*;
    use crate::mapper::test_support::VehicleFilters;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every `(filters, highlights)` pair it was called with and
    /// returns a pre-seeded outcome (or a pre-seeded failure) from a queue —
    /// enough to exercise dedup, monotonicity, and retry
    /// without a real HTTP client.
    #[derive(Clone)]
    pub struct FakeAdapter {
        pub calls: Arc<Mutex<Vec<(VehicleFilters, Option<VehicleFilters>)>>>,
        pub scripted: Arc<Mutex<Vec<Result<FetchOutcome<u32, u32>, FetchError>>>>,
    }

    impl FakeAdapter {
        pub fn new(scripted: Vec<Result<FetchOutcome<u32, u32>, FetchError>>) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                scripted: Arc::new(Mutex::new(scripted)),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    impl DataAdapter<VehicleFilters, u32, u32> for FakeAdapter {
        fn fetch_data<'a>(
            &'a self,
            filters: &'a VehicleFilters,
            highlights: Option<&'a VehicleFilters>,
        ) -> BoxFuture<'a, Result<FetchOutcome<u32, u32>, FetchError>> {
            self.calls.lock().push((filters.clone(), highlights.cloned()));
            let next = {
                let mut scripted = self.scripted.lock();
                if scripted.is_empty() {
                    Ok(FetchOutcome { results: vec![], total: 0, statistics: None })
                } else {
                    scripted.remove(0)
                }
            };
            Box::pin(async move { next })
        }
    }
}

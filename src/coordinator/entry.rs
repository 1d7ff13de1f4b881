//! Cache entry and in-flight record shapes.

use crate::error::CoordinatorError;
use std::time::Instant;
use tokio::sync::broadcast;

/// `{ payload, expiresAt }`.
pub(super) struct CacheEntry<T> {
    pub payload: T,
    pub expires_at: Instant,
}

/// `{ requestKey, sharedObservable, subscriberCount }`.
///
/// The broadcast channel is what lets late joiners share the pending
/// response, since every `subscribe()` call returns a receiver that will see
/// the one terminal value the owning task eventually sends. `subscriber_count`
/// additionally drives early abandonment: [`SubscriptionGuard`] decrements it
/// when a caller's `execute()` call drops its share of the in-flight request
/// (completion or cancellation alike), and the owning task's retry loop stops
/// retrying once it observes the count has reached zero rather than paying
/// for further attempts nobody is waiting on.
pub(super) struct InFlightEntry<T: Clone> {
    pub sender: broadcast::Sender<Result<T, CoordinatorError>>,
    pub subscriber_count: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

/// Held by a caller of `execute()` for as long as it shares an in-flight
/// request's result. Dropped on both normal return and task cancellation
/// (aborting `execute()`'s future drops its locals, this one included),
/// decrementing the shared count so the owning retry loop can notice.
pub(super) struct SubscriptionGuard {
    count: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl SubscriptionGuard {
    pub(super) fn new(count: std::sync::Arc<std::sync::atomic::AtomicUsize>) -> Self {
        Self { count }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, std::sync::atomic::Ordering::AcqRel);
    }
}

/// Options accepted by [`super::RequestCoordinator::execute`].
#[derive(Clone, Debug, Default)]
pub struct ExecuteOptions {
    pub skip_cache: bool,
    pub cache_ttl: Option<std::time::Duration>,
    pub max_retries: Option<u32>,
    pub initial_retry_delay: Option<std::time::Duration>,
}

//! The single writer/reader of browser URL state.
//!
//! Backed by `tokio::sync::watch` rather than a general pub/sub bus: the
//! channel carries exactly one current [`Params`] value, new subscribers
//! immediately see the latest one, and `send_if_modified`'s equality check
//! gives consecutive-duplicate dedup for free — there is never a backlog
//! to drain.

use crate::error::BrokerError;
use crate::params::Params;
use tokio::sync::watch;

use super::navigation::NavigationBackend;

/// Options accepted by [`UrlStateBroker::set_params`].
#[derive(Clone, Copy, Debug)]
pub struct SetParamsOptions {
    /// When `true` (the default), `next` is merged onto the current params
    /// (a key with an empty value removes it, per [`Params::merged_with`]).
    /// When `false`, `next` replaces the current params outright.
    pub merge: bool,
}

impl Default for SetParamsOptions {
    fn default() -> Self {
        Self { merge: true }
    }
}

/// The URL state broker. Holds the one `NavigationBackend` the whole system
/// is permitted to touch and republishes every committed change on a
/// `watch` channel that other components subscribe to instead of polling
/// the address bar themselves.
pub struct UrlStateBroker {
    backend: Box<dyn NavigationBackend>,
    params: watch::Sender<Params>,
}

impl UrlStateBroker {
    /// Builds a broker seeded from whatever the backend currently reports
    /// (e.g. the query string already in the address bar on page load).
    #[must_use]
    pub fn new(backend: Box<dyn NavigationBackend>) -> Self {
        let initial = Params::parse_query(&backend.read_query());
        let (params, _) = watch::channel(initial);
        Self { backend, params }
    }

    /// `params$`: a stream that replays the current value on subscribe and
    /// every value committed afterwards.
    #[must_use]
    pub fn params_stream(&self) -> watch::Receiver<Params> {
        self.params.subscribe()
    }

    /// The current params, synchronously.
    #[must_use]
    pub fn snapshot(&self) -> Params {
        self.params.borrow().clone()
    }

    /// Commits `next` to the URL, merging onto the current params unless
    /// `options.merge` is `false`. Subscribers only observe a change if the
    /// resolved params actually differ from the current ones.
    pub async fn set_params(
        &self,
        next: Params,
        options: SetParamsOptions,
    ) -> Result<(), BrokerError> {
        let resolved = if options.merge {
            self.snapshot().merged_with(&next)
        } else {
            next
        };
        self.commit(resolved).await
    }

    /// Removes `keys` from the current params, or every key when `keys` is
    /// `None`.
    pub async fn clear_params(&self, keys: Option<&[&str]>) -> Result<(), BrokerError> {
        let current = self.snapshot();
        let next = match keys {
            Some(keys) => current.without_keys(keys.iter().copied()),
            None => current.clear(),
        };
        self.commit(next).await
    }

    async fn commit(&self, next: Params) -> Result<(), BrokerError> {
        self.backend.write_query(next.to_canonical_string()).await?;
        self.params.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        Ok(())
    }
}

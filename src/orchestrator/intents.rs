//! Intent methods: the primary-mode surface a view (or the pop-out
//! routing table) calls to change what the orchestrator shows.
//!
//! `update_filters`/`update_highlights` take the whole next `Filters` value
//! rather than a partial patch, leaving it to the caller (a form handler, a
//! pop-out message handler) to apply its own partial edit and hand over the
//! result.

use super::ResourceOrchestrator;
use crate::adapter::{DataAdapter, FetchOutcome};
use crate::broker::SetParamsOptions;
use crate::cache_key::CacheKeyBuilder;
use crate::coordinator::ExecuteOptions;
use crate::error::OrchestratorError;
use crate::mapper::FilterMapper;
use crate::params::{HIGHLIGHT_PREFIX, Params};

/// An intent a pop-out's message handler can route to a primary
/// orchestrator without needing the caller to know
/// which concrete method it maps to.
#[derive(Clone, Debug)]
pub enum Intent<F> {
    UpdateFilters(F),
    ClearFilters,
    UpdateHighlights(F),
    ClearHighlights,
    Refresh,
}

impl<F, D, S, M, A, K> ResourceOrchestrator<F, D, S, M, A, K>
where
    F: Clone + PartialEq + Send + Sync + 'static,
    D: Clone + PartialEq + Send + Sync + 'static,
    S: Clone + PartialEq + Send + Sync + 'static,
    M: FilterMapper<F> + 'static,
    A: DataAdapter<F, D, S> + 'static,
    K: CacheKeyBuilder<F> + 'static,
{
    /// Dispatch a routed [`Intent`]. The counterpart of the TypeScript
    /// switch statement the pop-out manager's inbound handler runs.
    pub async fn apply_intent(&self, intent: Intent<F>) -> Result<(), OrchestratorError> {
        match intent {
            Intent::UpdateFilters(f) => self.update_filters(f).await,
            Intent::ClearFilters => self.clear_filters().await,
            Intent::UpdateHighlights(h) => self.update_highlights(h).await,
            Intent::ClearHighlights => self.clear_highlights().await,
            Intent::Refresh => self.refresh().await,
        }
    }

    /// Replace the filter portion of the URL with `filters`, leaving any
    /// `h_*` highlight keys untouched. Keys the new filters omit
    /// (because they reverted to a domain default) are dropped from the URL
    /// rather than lingering, which a plain `merge: true` write would not do.
    pub async fn update_filters(&self, filters: F) -> Result<(), OrchestratorError> {
        let broker = self.broker_or_err()?;
        let current = broker.snapshot();
        let next = highlight_only(&current).merged_with(&self.mapper().to_url_params(&filters));
        broker
            .set_params(next, SetParamsOptions { merge: false })
            .await
            .map_err(OrchestratorError::from)
    }

    /// Reset filters to the domain's defaults. Preserves the current
    /// highlight overlay when `config.preserve_highlights_on_clear` is set
    /// (see `DESIGN.md` for why this crate defaults that to `true`).
    pub async fn clear_filters(&self) -> Result<(), OrchestratorError> {
        let broker = self.broker_or_err()?;
        if self.config().preserve_highlights_on_clear {
            let current = broker.snapshot();
            broker
                .set_params(highlight_only(&current), SetParamsOptions { merge: false })
                .await
                .map_err(OrchestratorError::from)
        } else {
            broker.clear_params(None).await.map_err(OrchestratorError::from)
        }
    }

    /// Merge a highlight overlay onto the URL's `h_*` keys without disturbing
    /// the filter keys.
    pub async fn update_highlights(&self, highlights: F) -> Result<(), OrchestratorError> {
        let broker = self.broker_or_err()?;
        let highlight_params = self.mapper().to_highlight_params(&highlights);
        broker
            .set_params(highlight_params, SetParamsOptions { merge: true })
            .await
            .map_err(OrchestratorError::from)
    }

    /// Remove every `h_*` key from the URL, leaving filters untouched.
    pub async fn clear_highlights(&self) -> Result<(), OrchestratorError> {
        let broker = self.broker_or_err()?;
        let current = broker.snapshot();
        let keys: Vec<String> =
            current.highlight_keys().map(|(k, _)| format!("{HIGHLIGHT_PREFIX}{k}")).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        broker.clear_params(Some(&key_refs)).await.map_err(OrchestratorError::from)
    }

    /// Re-run the current fetch bypassing the coordinator's cache. Does not
    /// touch the URL, so it does not strictly need a broker —
    /// but it does need one to be considered "primary", matching the other
    /// intents' semantics of only running on the side that owns the URL.
    pub async fn refresh(&self) -> Result<(), OrchestratorError> {
        self.broker_or_err()?;
        let snapshot = self.snapshot();
        self.fetch_for(snapshot.filters, snapshot.highlights, ExecuteOptions { skip_cache: true, ..Default::default() })
            .await;
        Ok(())
    }

    fn broker_or_err(&self) -> Result<std::sync::Arc<crate::broker::UrlStateBroker>, OrchestratorError> {
        self.attached_broker().ok_or(OrchestratorError::NotAttachedToBroker)
    }
}

fn highlight_only(params: &Params) -> Params {
    Params::from_pairs(params.highlight_keys().map(|(k, v)| (format!("{HIGHLIGHT_PREFIX}{k}"), v.to_string())))
}

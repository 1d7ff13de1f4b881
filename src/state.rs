//! `ResourceState<F, D, S>` and the invariants attached to it.

use crate::error::CoordinatorError;

/// Snapshot of everything a view driven by the resource orchestrator needs
/// to render: the current filters, the current page of results, and the
/// bookkeeping (`loading`, `error`) that lets a UI distinguish "no results
/// yet" from "fetch in flight" from "fetch failed".
///
/// `F`, `D`, `S` are domain-owned: filters, a single result item, and the
/// optional aggregate statistics shape. The core never inspects them beyond
/// requiring `Clone + PartialEq`.
#[derive(Clone, Debug)]
pub struct ResourceState<F, D, S> {
    pub filters: F,
    pub results: Vec<D>,
    pub total_results: u64,
    pub loading: bool,
    pub error: Option<CoordinatorError>,
    pub statistics: Option<S>,
    pub highlights: Option<F>,
}

impl<F, D, S> ResourceState<F, D, S>
where
    F: Clone,
{
    /// Construct the initial state for a freshly constructed orchestrator:
    /// empty results, not loading, no error — the condition before the
    /// first successful fetch.
    pub fn initial(default_filters: F) -> Self {
        Self {
            filters: default_filters,
            results: Vec::new(),
            total_results: 0,
            loading: false,
            error: None,
            statistics: None,
            highlights: None,
        }
    }
}

impl<F: PartialEq, D: PartialEq, S: PartialEq> PartialEq for ResourceState<F, D, S> {
    fn eq(&self, other: &Self) -> bool {
        self.filters == other.filters
            && self.results == other.results
            && self.total_results == other.total_results
            && self.loading == other.loading
            && self.error.is_none() == other.error.is_none()
            && self.statistics == other.statistics
            && self.highlights == other.highlights
    }
}

/// A partial, URL-derived overlay over `F`. The core never
/// constructs one directly — it comes back out of
/// [`crate::mapper::FilterMapper::extract_highlights`] — but several
/// signatures need a name for "the highlight slot, as opposed to filters".
pub type Highlights<F> = F;

/// A single slice update applied to a [`ResourceState`] without disturbing
/// the fields it doesn't mention. Used internally by the orchestrator to
/// describe both URL-driven transitions and `syncStateFromExternal` merges
/// with one piece of code.
#[derive(Clone, Debug, Default)]
pub struct StateDelta<F, D, S> {
    pub filters: Option<F>,
    pub results: Option<Vec<D>>,
    pub total_results: Option<u64>,
    pub loading: Option<bool>,
    pub error: Option<Option<CoordinatorError>>,
    pub statistics: Option<Option<S>>,
    pub highlights: Option<Option<F>>,
}

impl<F, D, S> StateDelta<F, D, S> {
    /// Wrap a full snapshot so every field overwrites, used for `STATE_UPDATE`
    /// payloads, which always carry the complete state rather than
    /// a partial patch.
    ///
    /// `highlights` is the one field that does NOT follow "always overwrite":
    /// a sender with no active highlight overlay (`state.highlights ==
    /// None`) leaves `highlights` as `None` here too, so `apply()` preserves
    /// whatever overlay the receiver already had instead of clobbering it.
    /// A sender that does have an overlay still overwrites as normal.
    #[must_use]
    pub fn from_full(state: ResourceState<F, D, S>) -> Self {
        Self {
            filters: Some(state.filters),
            results: Some(state.results),
            total_results: Some(state.total_results),
            loading: Some(state.loading),
            error: Some(state.error),
            statistics: Some(state.statistics),
            highlights: state.highlights.map(Some),
        }
    }

    #[must_use]
    pub fn apply(self, base: &ResourceState<F, D, S>) -> ResourceState<F, D, S>
    where
        F: Clone,
        D: Clone,
        S: Clone,
    {
        ResourceState {
            filters: self.filters.unwrap_or_else(|| base.filters.clone()),
            results: self.results.unwrap_or_else(|| base.results.clone()),
            total_results: self.total_results.unwrap_or(base.total_results),
            loading: self.loading.unwrap_or(base.loading),
            error: self.error.unwrap_or_else(|| base.error.clone()),
            statistics: self.statistics.unwrap_or_else(|| base.statistics.clone()),
            highlights: self.highlights.unwrap_or_else(|| base.highlights.clone()),
        }
    }
}

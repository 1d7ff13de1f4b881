//! Retry classification and exponential backoff for the request coordinator.

use crate::error::FetchError;
use std::time::Duration;

/// How a failed fetch should be treated by the retry loop. Classified once
/// from the producer's error and then consulted twice: whether the attempt
/// counts against `max_retries` at all, and if so, how much extra delay its
/// class adds on top of the plain exponential backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryClass {
    /// The adapter marked the failure transport-class (connection refused,
    /// timed out, DNS failure) rather than an HTTP response at all.
    Transport,
    /// HTTP 429. Near-certain to succeed on a later attempt, but only after
    /// backing off harder than a plain server error.
    RateLimited,
    /// HTTP 500, 502, 503, or 504.
    ServerError,
    /// Any other HTTP status. Retrying it would just reproduce the same
    /// response, so it terminates the `execute` call immediately.
    ClientError,
    /// No status and not transport-class — an adapter error the coordinator
    /// can't characterize. Treated like `ClientError`: not worth a retry.
    Unknown,
}

/// The HTTP status codes the coordinator treats as retryable.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

impl RetryClass {
    /// Classify a failed fetch from the shape of its [`FetchError`].
    #[must_use]
    pub fn classify(err: &FetchError) -> Self {
        if err.is_transport() {
            return Self::Transport;
        }
        match err.http_status() {
            Some(429) => Self::RateLimited,
            Some(status) if RETRYABLE_STATUSES.contains(&status) => Self::ServerError,
            Some(_) => Self::ClientError,
            None => Self::Unknown,
        }
    }

    /// Whether a failure of this class should consume a retry attempt.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transport | Self::RateLimited | Self::ServerError)
    }

    /// Extra multiplier applied to the plain exponential delay before this
    /// class's attempt. A rate-limited response backs off harder than a
    /// transient server error, since retrying sooner just reproduces the
    /// same 429.
    #[must_use]
    pub fn delay_multiplier(self) -> f64 {
        match self {
            Self::Transport => 1.0,
            Self::ServerError => 1.5,
            Self::RateLimited => 3.0,
            Self::ClientError | Self::Unknown => 1.0,
        }
    }
}

/// Whether a given failure should consume a retry attempt.
///
/// A failure is retryable if the adapter marked it transport-class, or if it
/// carries one of the retryable HTTP statuses. Anything else (a 4xx other
/// than 429, or an error with no status at all) terminates the `execute`
/// call immediately. Equivalent to `RetryClass::classify(err).is_retryable()`.
#[must_use]
pub fn is_retryable(err: &FetchError) -> bool {
    RetryClass::classify(err).is_retryable()
}

/// `initial * 2^(attempt-1) * class.delay_multiplier()`, capped and
/// optionally jittered. `attempt` is 1-indexed: the delay before the first
/// retry uses `attempt == 1`.
#[must_use]
pub fn backoff_delay(
    attempt: u32,
    initial: Duration,
    cap: Duration,
    class: RetryClass,
    jitter: f64,
    jitter_sample: f64,
) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    let scaled = initial.saturating_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX));
    let adjusted_millis = scaled.as_millis() as f64 * class.delay_multiplier();
    let capped = Duration::from_millis(adjusted_millis as u64).min(cap);
    if jitter <= 0.0 {
        return capped;
    }
    // jitter_sample is expected in [-1.0, 1.0]; callers in production code
    // draw it from `rand`, tests pass fixed samples for determinism.
    let factor = 1.0 + jitter_sample.clamp(-1.0, 1.0) * jitter;
    let millis = (capped.as_millis() as f64 * factor).max(0.0) as u64;
    Duration::from_millis(millis)
}

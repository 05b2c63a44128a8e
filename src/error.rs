//! Errors surfaced synchronously when starting a run.
use thiserror::Error;

/// A configuration problem that prevents a run from starting.
///
/// Per-request failures never show up here: they are captured inside each
/// [`RequestReport`](crate::RequestReport) and aggregated by
/// [`summarize`](crate::summarize) instead of interrupting the run.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested send count was zero.
    #[error("number of requests must be greater than 0")]
    ZeroRequests,

    /// The default HTTP sender could not be constructed.
    #[error("failed to build the http client")]
    Client(#[source] reqwest::Error),
}

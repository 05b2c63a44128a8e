//! Per-request measurements and their reduction into a run summary.
use std::sync::Arc;

use tokio::time::{Duration, Instant};

use crate::runner::ResultStream;

/// The measurement of a single attempted request.
///
/// A report is always produced, whether the attempt succeeded or not; it is
/// immutable once it leaves the dispatcher.
#[derive(Debug, Clone)]
pub struct RequestReport {
    /// Response status code, or 0 if the call never completed.
    pub status: u16,
    /// Number of bytes drained from the response body before completion or
    /// failure.
    pub bytes: u64,
    /// Wall-clock duration of this attempt, up to completion or failure.
    pub duration: Duration,
    /// The failure cause, if the attempt failed.
    pub error: Option<Arc<anyhow::Error>>,
}

impl RequestReport {
    /// A report for a completed exchange.
    pub fn new(status: u16, bytes: u64, duration: Duration) -> Self {
        Self { status, bytes, duration, error: None }
    }

    /// A report for an attempt that failed with `error`.
    ///
    /// `status` is whatever code was obtainable before the failure, or 0.
    pub fn failed(status: u16, bytes: u64, duration: Duration, error: anyhow::Error) -> Self {
        Self { status, bytes, duration, error: Some(Arc::new(error)) }
    }

    /// Whether this attempt failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate statistics over a full run.
///
/// Produced by [`summarize`]; the [`Default`] value is the all-zero summary
/// of an empty stream.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    /// Total number of requests attempted.
    pub requests: u64,
    /// Number of failed requests.
    pub errors: u64,
    /// Total bytes received across all responses.
    pub bytes: u64,
    /// Fastest single-request duration.
    pub fastest: Duration,
    /// Slowest single-request duration.
    pub slowest: Duration,
    /// Average single-request duration (latency).
    pub average: Duration,
    /// Wall-clock duration of the whole run.
    pub duration: Duration,
    /// Observed throughput, in requests per second.
    pub rps: f64,
    /// Percentage of requests that completed without error.
    pub success: f64,
}

/// Reduce a [`ResultStream`] into a [`Summary`].
///
/// Runs in a single pass with O(1) extra memory: running min, max and sums,
/// with the derived fields computed at the end. The wall-clock duration and
/// throughput are measured around the reduction itself rather than summed
/// from individual latencies: under concurrency the observed rate is
/// normally higher than the reciprocal of the average latency, and only the
/// former reflects what the server actually sustained.
pub async fn summarize(mut results: ResultStream) -> Summary {
    let mut summary = Summary::default();
    let mut latency_sum = Duration::ZERO;

    let start = Instant::now();
    while let Some(report) = results.next().await {
        summary.requests += 1;
        summary.bytes += report.bytes;
        if report.is_error() {
            summary.errors += 1;
        }
        if summary.fastest.is_zero() || report.duration < summary.fastest {
            summary.fastest = report.duration;
        }
        summary.slowest = summary.slowest.max(report.duration);
        latency_sum += report.duration;
    }
    summary.duration = start.elapsed();

    if summary.requests > 0 {
        summary.average = latency_sum / summary.requests as u32;
        summary.success =
            (summary.requests - summary.errors) as f64 / summary.requests as f64 * 100.0;
        if !summary.duration.is_zero() {
            summary.rps = summary.requests as f64 / summary.duration.as_secs_f64();
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    fn fixed_reports() -> Vec<RequestReport> {
        vec![
            RequestReport::new(200, 100, Duration::from_millis(100)),
            RequestReport::new(200, 500, Duration::from_millis(300)),
            RequestReport::failed(
                0,
                0,
                Duration::from_millis(500),
                anyhow!("server can't be reached"),
            ),
        ]
    }

    #[tokio::test]
    async fn summarize_known_values() {
        let summary = summarize(ResultStream::from(fixed_reports())).await;

        assert_eq!(summary.requests, 3);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.bytes, 600);
        assert_eq!(summary.fastest, Duration::from_millis(100));
        assert_eq!(summary.slowest, Duration::from_millis(500));
        assert_eq!(summary.average, Duration::from_millis(300));
        assert!((summary.success - 200.0 / 3.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn summarize_empty_stream() {
        let summary = summarize(ResultStream::from(Vec::new())).await;

        assert_eq!(summary.requests, 0);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.bytes, 0);
        assert_eq!(summary.fastest, Duration::ZERO);
        assert_eq!(summary.slowest, Duration::ZERO);
        assert_eq!(summary.average, Duration::ZERO);
        assert_eq!(summary.rps, 0.0);
        assert_eq!(summary.success, 0.0);
    }

    #[tokio::test]
    async fn summarize_is_idempotent() {
        let first = summarize(ResultStream::from(fixed_reports())).await;
        let second = summarize(ResultStream::from(fixed_reports())).await;

        assert_eq!(first.requests, second.requests);
        assert_eq!(first.errors, second.errors);
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.fastest, second.fastest);
        assert_eq!(first.slowest, second.slowest);
        assert_eq!(first.average, second.average);
        assert_eq!(first.success, second.success);
        // wall-clock derived fields only match within a tolerance
        assert!(first.duration.abs_diff(second.duration) < Duration::from_millis(5));
    }
}

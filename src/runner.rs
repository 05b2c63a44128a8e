//! The run entry point: options, the lazy result stream, and [`send_n`].
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{
    error::Error,
    pipeline,
    report::RequestReport,
    request::RequestTemplate,
    sender::{HttpSender, Sender, SenderConfig},
};

/// Options for a load generation run.
///
/// Unset or out-of-range fields fall back to defaults: [`send_n`] normalizes
/// on entry, so callers may pass options as sparse as `Options::default()`.
#[derive(Clone, Default)]
pub struct Options {
    /// Number of concurrent workers. Zero is treated as 1.
    pub concurrency: usize,
    /// Upper bound on requests per second. Zero disables throttling.
    ///
    /// The unsigned type doubles as the "clamp negative rates to zero" rule:
    /// a rate below zero is unrepresentable.
    pub rate: u32,
    /// The send operation. `None` selects the default [`HttpSender`].
    pub sender: Option<Arc<dyn Sender>>,
}

impl Options {
    /// Returns the options with defaults applied to unset fields.
    pub fn normalized(mut self) -> Self {
        if self.concurrency == 0 {
            self.concurrency = 1;
        }
        self
    }
}

/// The lazily-produced stream of per-request reports.
///
/// Forward-only and single-pass: reports are pulled one at a time with
/// [`next`](Self::next), in no particular order relative to submission, and
/// the stream cannot be restarted. Dropping it, fully drained or not,
/// cancels the run scope, which promptly stops the producer, the throttler
/// and every dispatch worker.
pub struct ResultStream {
    reports: mpsc::Receiver<RequestReport>,
    _scope: DropGuard,
}

impl ResultStream {
    /// Pull the next report, or `None` once the run is complete.
    pub async fn next(&mut self) -> Option<RequestReport> {
        self.reports.recv().await
    }
}

impl From<Vec<RequestReport>> for ResultStream {
    /// Wrap pre-collected reports in a stream, e.g. to feed buffered results
    /// back into [`summarize`](crate::summarize).
    fn from(reports: Vec<RequestReport>) -> Self {
        let (tx, rx) = mpsc::channel(reports.len().max(1));
        for report in reports {
            // capacity matches the report count, so this cannot fail
            let _ = tx.try_send(report);
        }
        Self { reports: rx, _scope: CancellationToken::new().drop_guard() }
    }
}

/// Dispatch `n` clones of `template` and return the live stream of reports.
///
/// The stream yields one [`RequestReport`] per attempted request: exactly
/// `n` when fully drained, fewer when the run is cancelled first.
/// Cancellation is not an error: the stream simply ends early, and the
/// caller distinguishes truncation by inspecting its own token afterwards.
///
/// The run is scoped to a child of `cancel`: cancelling the parent stops the
/// run, while dropping the returned stream stops the run without touching
/// the parent. Must be called within a Tokio runtime.
///
/// # Errors
///
/// Returns [`Error::ZeroRequests`] when `n` is zero, and [`Error::Client`]
/// when the default sender cannot be built. Both are reported before any
/// task is spawned.
pub fn send_n(
    cancel: &CancellationToken,
    n: u64,
    options: Options,
    template: RequestTemplate,
) -> Result<ResultStream, Error> {
    let options = options.normalized();

    if n == 0 {
        return Err(Error::ZeroRequests);
    }

    let sender: Arc<dyn Sender> = match &options.sender {
        Some(sender) => Arc::clone(sender),
        None => {
            let config = SenderConfig {
                pool_size: options.concurrency,
                ..SenderConfig::default()
            };
            Arc::new(HttpSender::new(&config)?)
        }
    };

    let scope = cancel.child_token();
    let reports = pipeline::run(
        scope.clone(),
        n,
        options.concurrency,
        options.rate,
        sender,
        template,
    );

    Ok(ResultStream { reports, _scope: scope.drop_guard() })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::{
        sync::Mutex,
        time::{Duration, Instant, sleep},
    };
    use url::Url;

    use super::*;

    fn test_template() -> RequestTemplate {
        RequestTemplate::get(Url::parse("http://localhost:8080/").unwrap())
    }

    /// A sender that sleeps for a fixed latency and reports success.
    struct FixedSender {
        latency: Duration,
    }

    #[async_trait]
    impl Sender for FixedSender {
        async fn send(&self, _: &RequestTemplate) -> RequestReport {
            sleep(self.latency).await;
            RequestReport::new(200, 50, self.latency)
        }
    }

    /// A sender that tracks how many calls are in flight at once.
    #[derive(Default)]
    struct GaugeSender {
        in_flight: AtomicUsize,
        high_water: AtomicUsize,
        started: AtomicUsize,
    }

    #[async_trait]
    impl Sender for GaugeSender {
        async fn send(&self, _: &RequestTemplate) -> RequestReport {
            self.started.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(current, Ordering::SeqCst);

            sleep(Duration::from_millis(5)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            RequestReport::new(200, 0, Duration::from_millis(5))
        }
    }

    #[test]
    fn options_default_normalization() {
        let options = Options::default().normalized();
        assert_eq!(options.concurrency, 1);
        assert_eq!(options.rate, 0);
        assert!(options.sender.is_none());
    }

    #[test]
    fn options_keep_valid_values() {
        let options = Options { concurrency: 2, rate: 5, sender: None }.normalized();
        assert_eq!(options.concurrency, 2);
        assert_eq!(options.rate, 5);
    }

    #[tokio::test]
    async fn send_n_rejects_zero_requests() {
        let cancel = CancellationToken::new();
        let result = send_n(&cancel, 0, Options::default(), test_template());
        assert!(matches!(result, Err(Error::ZeroRequests)));
    }

    #[tokio::test(start_paused = true)]
    async fn send_n_yields_exactly_n_reports() {
        const N: u64 = 50;

        let options = Options {
            sender: Some(Arc::new(FixedSender { latency: Duration::from_millis(10) })),
            ..Options::default()
        };

        let cancel = CancellationToken::new();
        let mut stream = send_n(&cancel, N, options, test_template()).unwrap();

        let mut got = 0;
        while let Some(report) = stream.next().await {
            assert_eq!(report.status, 200);
            got += 1;
        }
        assert_eq!(got, N);
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_concurrency_sends_in_flight() {
        const CONCURRENCY: usize = 4;

        let gauge = Arc::new(GaugeSender::default());
        let options = Options {
            concurrency: CONCURRENCY,
            sender: Some(Arc::clone(&gauge) as Arc<dyn Sender>),
            ..Options::default()
        };

        let cancel = CancellationToken::new();
        let mut stream = send_n(&cancel, 32, options, test_template()).unwrap();
        while stream.next().await.is_some() {}

        assert!(gauge.high_water.load(Ordering::SeqCst) <= CONCURRENCY);
        // the pool actually ran in parallel, not just below the cap
        assert!(gauge.high_water.load(Ordering::SeqCst) > 1);
    }

    /// A sender that records when each request reaches the dispatch boundary.
    struct ArrivalSender {
        arrivals: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl Sender for ArrivalSender {
        async fn send(&self, _: &RequestTemplate) -> RequestReport {
            self.arrivals.lock().await.push(Instant::now());
            RequestReport::new(200, 0, Duration::ZERO)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_paces_dispatch_to_rate() {
        const RATE: u32 = 100; // one admission per 10ms

        let arrivals = Arc::new(ArrivalSender { arrivals: Mutex::new(Vec::new()) });
        let options = Options {
            rate: RATE,
            sender: Some(Arc::clone(&arrivals) as Arc<dyn Sender>),
            ..Options::default()
        };

        let cancel = CancellationToken::new();
        let mut stream = send_n(&cancel, 20, options, test_template()).unwrap();
        while stream.next().await.is_some() {}

        let arrivals = arrivals.arrivals.lock().await;
        let mut gaps: Vec<Duration> = arrivals.windows(2).map(|w| w[1] - w[0]).collect();
        gaps.sort();

        let median = gaps[gaps.len() / 2];
        let interval = Duration::from_secs(1) / RATE;
        assert!(
            median >= interval - Duration::from_millis(1)
                && median <= interval + Duration::from_millis(1),
            "median inter-arrival gap {median:?} strays from {interval:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_stream_stops_production() {
        const N: u64 = 100;

        let gauge = Arc::new(GaugeSender::default());
        let options = Options {
            concurrency: 2,
            sender: Some(Arc::clone(&gauge) as Arc<dyn Sender>),
            ..Options::default()
        };

        let cancel = CancellationToken::new();
        let mut stream = send_n(&cancel, N, options, test_template()).unwrap();

        for _ in 0..3 {
            assert!(stream.next().await.is_some());
        }
        drop(stream);

        // give the stages a grace period to observe the cancellation
        sleep(Duration::from_millis(100)).await;
        let settled = gauge.started.load(Ordering::SeqCst);
        assert!(settled < N as usize);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(gauge.started.load(Ordering::SeqCst), settled);
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_truncates_the_stream() {
        let gauge = Arc::new(GaugeSender::default());
        let options = Options {
            sender: Some(Arc::clone(&gauge) as Arc<dyn Sender>),
            ..Options::default()
        };

        let cancel = CancellationToken::new();
        let mut stream = send_n(&cancel, 1000, options, test_template()).unwrap();

        for _ in 0..5 {
            assert!(stream.next().await.is_some());
        }
        cancel.cancel();

        // the stream ends early instead of erroring
        let mut rest = 0;
        while stream.next().await.is_some() {
            rest += 1;
        }
        assert!(rest <= 2, "expected prompt truncation, drained {rest} more");
        assert!(cancel.is_cancelled());
    }
}

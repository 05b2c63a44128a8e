//! The pluggable send operation and its default HTTP implementation.
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::redirect;
use tokio::time::{Duration, Instant};

use crate::{error::Error, report::RequestReport, request::RequestTemplate};

/// Default per-request timeout of the [`HttpSender`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The send operation invoked by each dispatcher worker.
///
/// Implementations must always return a [`RequestReport`]: transport errors,
/// timeouts and unexpected statuses are captured inside the report, never
/// raised. Tests swap in deterministic fakes.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Perform one request and measure it.
    async fn send(&self, request: &RequestTemplate) -> RequestReport;
}

/// Configuration for the default [`HttpSender`].
#[derive(Clone, Debug)]
pub struct SenderConfig {
    /// Fixed per-request timeout.
    pub timeout: Duration,
    /// Per-host idle connection capacity. Must be at least the dispatch
    /// concurrency, or connection setup dominates latency under load.
    pub pool_size: usize,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, pool_size: 1 }
    }
}

/// The default network sender, backed by a pooling [`reqwest::Client`].
///
/// Redirects are not followed: a redirect is reported as its original
/// status. The response body is drained and discarded chunk by chunk, so
/// memory stays bounded regardless of response size.
pub struct HttpSender {
    client: reqwest::Client,
}

impl HttpSender {
    /// Build a sender from the given config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] when the underlying client cannot be built.
    pub fn new(config: &SenderConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(config.pool_size.max(1))
            .build()
            .map_err(Error::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Sender for HttpSender {
    async fn send(&self, request: &RequestTemplate) -> RequestReport {
        let start = Instant::now();

        let mut status = 0;
        let mut bytes = 0;
        let mut cause = None;

        let sent = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone())
            .send()
            .await;

        match sent {
            Ok(mut response) => {
                status = response.status().as_u16();
                // we only need the byte count, so drain and discard
                loop {
                    match response.chunk().await {
                        Ok(Some(chunk)) => bytes += chunk.len() as u64,
                        Ok(None) => break,
                        Err(err) => {
                            cause = Some(err);
                            break;
                        }
                    }
                }
            }
            Err(err) => cause = Some(err),
        }

        let error = cause.map(|err| {
            tracing::debug!(url = %request.url(), %err, "request failed");
            Arc::new(anyhow::Error::new(err))
        });

        RequestReport { status, bytes, duration: start.elapsed(), error }
    }
}

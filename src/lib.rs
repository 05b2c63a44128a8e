//! A concurrent HTTP load generation engine.
//!
//! volley dispatches N clones of a request template against a server from a
//! fixed-size pool of workers, optionally paced to a maximum rate, and
//! reduces the per-request measurements into a run summary. The pipeline is
//! built from rendezvous-style channel handoffs, so backpressure from a slow
//! consumer reaches all the way back to the producer, and a single
//! cancellation signal unwinds every stage without leaking workers.
//!
//! ## Features
//!
//! - **Bounded concurrency**: at most `concurrency` requests in flight.
//! - **Rate throttling**: an optional hard ceiling on requests per second.
//! - **Lazy results**: reports are pulled one at a time; dropping the stream
//!   stops the run promptly.
//! - **Pluggable sending**: swap the network [`Sender`] for a deterministic
//!   fake in tests.
//!
//! ## Example
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//! use volley::{Options, RequestTemplate, send_n, summarize};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let template = RequestTemplate::get(Url::parse("http://localhost:8080/")?);
//!     let options = Options { concurrency: 8, rate: 100, ..Options::default() };
//!
//!     let stream = send_n(&CancellationToken::new(), 1000, options, template)?;
//!     let summary = summarize(stream).await;
//!
//!     println!("{:.1} req/s, {:.2}% success", summary.rps, summary.success);
//!     Ok(())
//! }
//! ```
#![deny(missing_docs)]

mod error;
mod pipeline;
mod report;
mod request;
mod runner;
mod sender;
mod util;

pub mod cli;
pub mod reporter;

pub use crate::{
    error::Error,
    report::{RequestReport, Summary, summarize},
    request::RequestTemplate,
    runner::{Options, ResultStream, send_n},
    sender::{DEFAULT_TIMEOUT, HttpSender, Sender, SenderConfig},
};

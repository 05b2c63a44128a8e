//! This module provides the CLI layer for the load generation engine.
//!
//! [`LoadCli`] carries everything a run needs: the target, the request
//! count, the concurrency and rate bounds, the per-request timeout and the
//! output format. [`run`] validates the options, drives the engine and
//! prints the summary.
use std::{
    io::stdout,
    num::{NonZeroU32, NonZeroU64, NonZeroUsize},
    sync::Arc,
};

use anyhow::{Result, bail, ensure};
use clap::{
    Parser, ValueEnum,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    report::summarize,
    reporter::{JsonReporter, SummaryReporter, TextReporter},
    request::RequestTemplate,
    runner::{Options, send_n},
    sender::{HttpSender, SenderConfig},
};

/// Command line options for a load generation run.
#[derive(Parser, Clone, Debug)]
#[clap(
    styles(Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
    )
)]
pub struct LoadCli {
    /// Target URL
    pub url: Url,

    /// Number of requests to send
    #[clap(long, short = 'n', default_value = "1000")]
    pub requests: NonZeroU64,

    /// Number of workers to run concurrently
    #[clap(long, short = 'c', default_value = "1")]
    pub concurrency: NonZeroUsize,

    /// Upper bound on requests per second
    ///
    /// When unset, requests are dispatched as fast as the workers allow.
    #[clap(long, short = 'r')]
    pub rate: Option<NonZeroU32>,

    /// Per-request timeout
    ///
    /// Examples: -t 500ms, -t 30s
    #[clap(long, short = 't', default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Output format for the summary
    #[clap(short, long, value_enum, default_value_t = ReportFormat::Text, ignore_case = true)]
    pub output: ReportFormat,
}

/// Summary output format.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ReportFormat {
    /// Plain text. See [`TextReporter`].
    Text,

    /// JSON. See [`JsonReporter`].
    Json,
}

impl LoadCli {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.url.has_host(),
            "invalid url {:?}: a scheme and host are required",
            self.url.as_str()
        );
        ensure!(
            self.concurrency.get() as u64 <= self.requests.get(),
            "concurrency (-c {}) cannot exceed the number of requests (-n {})",
            self.concurrency,
            self.requests
        );
        Ok(())
    }
}

/// Run the engine with the given CLI options and print the summary.
///
/// Ctrl-C cancels the run; the summary of whatever completed is still
/// printed before the interruption is reported as an error.
pub async fn run(cli: LoadCli) -> Result<()> {
    cli.validate()?;

    let sender = HttpSender::new(&SenderConfig {
        timeout: cli.timeout.into(),
        pool_size: cli.concurrency.get(),
    })?;
    let options = Options {
        concurrency: cli.concurrency.get(),
        rate: cli.rate.map_or(0, NonZeroU32::get),
        sender: Some(Arc::new(sender)),
    };
    let template = RequestTemplate::get(cli.url.clone());

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping early");
            interrupt.cancel();
        }
    });

    println!(
        "Sending {} requests to {} (concurrency={})",
        cli.requests, cli.url, cli.concurrency
    );

    let stream = send_n(&cancel, cli.requests.get(), options, template)?;
    let summary = summarize(stream).await;

    let reporter: &dyn SummaryReporter = match cli.output {
        ReportFormat::Text => &TextReporter,
        ReportFormat::Json => &JsonReporter,
    };
    reporter.print(&mut stdout(), &summary)?;

    if cancel.is_cancelled() {
        bail!(
            "interrupted after {} of {} requests",
            summary.requests,
            cli.requests
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> LoadCli {
        LoadCli::try_parse_from(args).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&["volley", "http://localhost:8080/"]);
        assert_eq!(cli.requests.get(), 1000);
        assert_eq!(cli.concurrency.get(), 1);
        assert!(cli.rate.is_none());
        assert_eq!(std::time::Duration::from(cli.timeout).as_secs(), 30);
    }

    #[test]
    fn rejects_zero_flags() {
        assert!(LoadCli::try_parse_from(["volley", "-n", "0", "http://localhost/"]).is_err());
        assert!(LoadCli::try_parse_from(["volley", "-c", "0", "http://localhost/"]).is_err());
    }

    #[test]
    fn concurrency_must_not_exceed_requests() {
        let cli = parse(&["volley", "-n", "5", "-c", "10", "http://localhost:8080/"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn url_requires_a_host() {
        let cli = parse(&["volley", "mailto:admin@localhost"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn valid_options_pass() {
        let cli = parse(&["volley", "-n", "100", "-c", "10", "-r", "50", "http://localhost:8080/"]);
        assert!(cli.validate().is_ok());
    }
}

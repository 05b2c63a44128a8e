use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::{Duration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use url::Url;
use volley::{Options, RequestReport, RequestTemplate, Sender, send_n, summarize};

/// A sender that fakes a round trip instead of touching the network.
struct FakeSender;

#[async_trait]
impl Sender for FakeSender {
    async fn send(&self, _: &RequestTemplate) -> RequestReport {
        let start = Instant::now();
        sleep(Duration::from_millis(5)).await;
        RequestReport::new(200, 128, start.elapsed())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let template = RequestTemplate::get(Url::parse("http://localhost/")?);
    let options = Options {
        concurrency: 4,
        sender: Some(Arc::new(FakeSender)),
        ..Options::default()
    };

    let stream = send_n(&CancellationToken::new(), 100, options, template)?;
    let summary = summarize(stream).await;

    println!("{summary:#?}");
    Ok(())
}

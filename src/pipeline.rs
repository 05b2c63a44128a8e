//! The producer → throttler → dispatcher pipeline.
//!
//! Each stage owns the sender side of its output channel and drops it on the
//! way out, which closes the channel and lets the stage downstream finish
//! its `recv` loop. Every wait (emit, tick, receive, the network call, the
//! forward) is raced against the run-scoped cancellation token, so a
//! cancelled run unwinds without leaking workers or deadlocking on a full
//! channel.
use std::sync::Arc;

use tokio::{
    select,
    sync::{Mutex, mpsc},
    time::{self, Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{report::RequestReport, request::RequestTemplate, sender::Sender};

/// Capacity of every inter-stage channel. One is the closest Tokio gets to a
/// rendezvous handoff: a sender blocks as soon as a single item is waiting,
/// so backpressure from a slow consumer reaches the producer end-to-end.
const HANDOFF: usize = 1;

/// Wire up the stages and return the dispatcher's output.
///
/// The throttler is bypassed entirely when `rate` is zero: the producer
/// feeds the dispatcher directly.
pub(crate) fn run(
    cancel: CancellationToken,
    n: u64,
    concurrency: usize,
    rate: u32,
    sender: Arc<dyn Sender>,
    template: RequestTemplate,
) -> mpsc::Receiver<RequestReport> {
    let requests = produce(cancel.clone(), n, template);

    let requests = if rate > 0 {
        throttle(cancel.clone(), rate, requests)
    } else {
        requests
    };

    dispatch(cancel, concurrency, sender, requests)
}

/// Stage 1: emit exactly `n` clones of the template, or fewer when
/// cancelled. Emission suspends until the next stage is ready to receive.
fn produce(
    cancel: CancellationToken,
    n: u64,
    template: RequestTemplate,
) -> mpsc::Receiver<RequestTemplate> {
    let (tx, rx) = mpsc::channel(HANDOFF);

    tokio::spawn(async move {
        for _ in 0..n {
            select! {
                biased;
                _ = cancel.cancelled() => return,
                sent = tx.send(template.clone()) => {
                    // a send error means downstream already hung up
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    });

    rx
}

/// Stage 2: admit at most one request per `1s / rate` tick.
///
/// The ticking policy is a hard rate ceiling: missed ticks are delayed, not
/// replayed, so a stall under load never earns a burst of catch-up sends.
fn throttle(
    cancel: CancellationToken,
    rate: u32,
    mut requests: mpsc::Receiver<RequestTemplate>,
) -> mpsc::Receiver<RequestTemplate> {
    let (tx, rx) = mpsc::channel(HANDOFF);

    tokio::spawn(async move {
        let mut ticks = time::interval(Duration::from_secs(1) / rate);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let request = select! {
                biased;
                _ = cancel.cancelled() => return,
                request = requests.recv() => match request {
                    Some(request) => request,
                    None => return,
                },
            };

            select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = ticks.tick() => {}
            }

            select! {
                biased;
                _ = cancel.cancelled() => return,
                sent = tx.send(request) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    });

    rx
}

/// Stage 3: a fixed pool of `concurrency` workers racing to pull requests
/// and send them.
///
/// The locked receiver hands each request to exactly one worker, so at most
/// `concurrency` sends are in flight at any instant. Reports arrive out of
/// submission order. The output closes once the last worker drops its
/// sender clone; that is the join barrier gating the end of the stream,
/// and it makes a double close unrepresentable.
fn dispatch(
    cancel: CancellationToken,
    concurrency: usize,
    sender: Arc<dyn Sender>,
    requests: mpsc::Receiver<RequestTemplate>,
) -> mpsc::Receiver<RequestReport> {
    let (tx, rx) = mpsc::channel(HANDOFF);
    let requests = Arc::new(Mutex::new(requests));

    for worker in 0..concurrency {
        let cancel = cancel.clone();
        let requests = Arc::clone(&requests);
        let sender = Arc::clone(&sender);
        let tx = tx.clone();

        tokio::spawn(async move {
            loop {
                let request = select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    request = async { requests.lock().await.recv().await } => match request {
                        Some(request) => request,
                        None => break,
                    },
                };

                // dropping the in-flight future aborts the call
                let report = select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    report = sender.send(&request) => report,
                };

                // abandon the forward rather than block on a gone consumer
                select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = tx.send(report) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::trace!(worker, "dispatch worker finished");
        });
    }

    rx
}

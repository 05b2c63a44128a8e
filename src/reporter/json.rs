use std::io::Write;

use serde::Serialize;

use super::SummaryReporter;
use crate::report::Summary;

/// Renders a [`Summary`] as pretty-printed JSON.
pub struct JsonReporter;

impl SummaryReporter for JsonReporter {
    fn print(&self, w: &mut dyn Write, summary: &Summary) -> anyhow::Result<()> {
        let report = Report {
            requests: summary.requests,
            errors: summary.errors,
            bytes: summary.bytes,
            success_ratio: summary.success,
            total_time: summary.duration.as_secs_f64(),
            rps: summary.rps,
            latency: Latency {
                average: summary.average.as_secs_f64(),
                fastest: summary.fastest.as_secs_f64(),
                slowest: summary.slowest.as_secs_f64(),
            },
        };

        serde_json::to_writer_pretty(&mut *w, &report)?;
        writeln!(w)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct Report {
    requests: u64,
    errors: u64,
    bytes: u64,
    success_ratio: f64,
    total_time: f64,
    rps: f64,
    latency: Latency,
}

#[derive(Serialize)]
struct Latency {
    average: f64,
    fastest: f64,
    slowest: f64,
}

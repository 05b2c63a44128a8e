//! This module defines a trait for printing run summaries.
mod json;
mod text;

pub use json::JsonReporter;
pub use text::TextReporter;

use crate::report::Summary;

/// A trait for rendering a [`Summary`] to a writer.
pub trait SummaryReporter {
    /// Print the summary to the given writer.
    fn print(&self, w: &mut dyn std::io::Write, summary: &Summary) -> anyhow::Result<()>;
}

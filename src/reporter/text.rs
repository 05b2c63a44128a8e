use std::io::Write;

use crossterm::style::{StyledContent, Stylize};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Padding, Style,
        object::{Columns, Object, Rows},
        themes::Colorization,
    },
};

use crate::{
    report::Summary,
    util::{HumanDuration, adjusted_bytes},
};

/// Renders a [`Summary`] as styled plain text.
pub struct TextReporter;

impl super::SummaryReporter for TextReporter {
    fn print(&self, w: &mut dyn Write, summary: &Summary) -> anyhow::Result<()> {
        print_overview(w, summary)?;
        writeln!(w)?;

        if summary.requests > 0 {
            print_throughput(w, summary)?;
            writeln!(w)?;

            print_latency(w, summary)?;
        }

        Ok(())
    }
}

fn render_success(success: f64) -> StyledContent<String> {
    let text = format!("{success:.2}%");
    if success >= 100.0 {
        text.green().bold()
    } else if success >= 99.0 {
        text.yellow().bold()
    } else {
        text.red().bold()
    }
}

#[rustfmt::skip]
fn print_overview(w: &mut dyn Write, summary: &Summary) -> anyhow::Result<()> {
    writeln!(w, "{}", "Summary".h1())?;
    writeln!(w,       "  Time:     {}", format!("{:.2}s", summary.duration.as_secs_f64()).green().bold())?;
    writeln!(w,       "  Success:  {}", render_success(summary.success))?;
    writeln!(w,       "  Errors:   {}", format!("{}", summary.errors).green().bold())?;
    Ok(())
}

fn print_throughput(w: &mut dyn Write, summary: &Summary) -> anyhow::Result<()> {
    let elapsed = summary.duration.as_secs_f64();
    let rows = vec![
        vec!["".into(), "Total".into(), "Rate".into()],
        vec![
            "Requests".into(),
            format!("{}", summary.requests),
            format!("{:.2}/s", summary.rps),
        ],
        vec![
            "Bytes".into(),
            format!("{:.2}", adjusted_bytes(summary.bytes)),
            format!("{:.2}/s", adjusted_bytes((summary.bytes as f64 / elapsed) as u64)),
        ],
    ];

    let mut table = Builder::from(rows).build();
    table
        .with(Style::empty())
        .with(Alignment::center())
        .with(Padding::new(2, 2, 0, 0))
        .with(Colorization::exact([Color::BOLD], Rows::new(0..=0)))
        .with(Colorization::exact(
            [Color::FG_GREEN],
            Rows::new(1..=2).not(Columns::new(0..=0)),
        ));
    writeln!(w, "{table}")?;

    Ok(())
}

fn print_latency(w: &mut dyn Write, summary: &Summary) -> anyhow::Result<()> {
    writeln!(w, "{}", "Latencies".h1())?;

    let rows = vec![
        vec!["Avg".into(), "Fastest".into(), "Slowest".into()],
        vec![
            HumanDuration(summary.average).to_string(),
            HumanDuration(summary.fastest).to_string(),
            HumanDuration(summary.slowest).to_string(),
        ],
    ];

    let mut table = Builder::from(rows).build();
    table
        .with(Style::empty())
        .with(Alignment::center())
        .with(Padding::new(2, 2, 0, 0))
        .with(Colorization::exact([Color::BOLD], Rows::new(0..=0)))
        .with(Colorization::exact([Color::FG_GREEN], Rows::new(1..=1)));
    writeln!(w, "{table}")?;

    Ok(())
}

trait ReportStyle {
    fn h1(&self) -> StyledContent<&str>;
}

impl<T: AsRef<str>> ReportStyle for T {
    fn h1(&self) -> StyledContent<&str> {
        self.as_ref().bold().underlined().yellow()
    }
}

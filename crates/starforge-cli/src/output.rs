//! Summary printed after a render.
//!
//! `text` is a short human report; `json` serializes [`RenderSummary`] for
//! scripts.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use starforge_lib::location::LocationSource;
use starforge_lib::RenderReport;

use crate::commands::render::RenderOutcome;
use crate::terminal::ColorPalette;

/// Format of the summary on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Machine-readable record of a render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSummary {
    pub output: PathBuf,
    pub location: String,
    pub location_source: LocationSource,
    pub instant: DateTime<Utc>,
    pub load_rejections: usize,
    pub elapsed_ms: u128,
    pub report: RenderReport,
}

impl RenderSummary {
    pub fn new(outcome: RenderOutcome, elapsed: Duration) -> Self {
        Self {
            output: outcome.path,
            location: outcome.location.label,
            location_source: outcome.location.source,
            instant: outcome.instant,
            load_rejections: outcome.load_rejections,
            elapsed_ms: elapsed.as_millis(),
            report: outcome.report,
        }
    }
}

/// Write the summary in the requested format.
pub fn write_summary<W: Write>(
    out: &mut W,
    summary: &RenderSummary,
    format: OutputFormat,
    palette: ColorPalette,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, summary)?;
            writeln!(out)?;
        }
        OutputFormat::Text => write_text(out, summary, palette)?,
    }
    Ok(())
}

fn write_text<W: Write>(out: &mut W, summary: &RenderSummary, p: ColorPalette) -> Result<()> {
    let report = &summary.report;
    let observer = &report.observer;

    writeln!(
        out,
        "{}Star chart saved{} to {}{}{}",
        p.ok,
        p.reset,
        p.heading,
        summary.output.display(),
        p.reset
    )?;
    writeln!(
        out,
        "  {}location{}  {} ({:.4}, {:.4})",
        p.muted, p.reset, summary.location, observer.latitude, observer.longitude
    )?;
    writeln!(
        out,
        "  {}time{}      {}",
        p.muted,
        p.reset,
        summary.instant.format("%Y-%m-%d %H:%M UTC")
    )?;
    writeln!(
        out,
        "  {}stars{}     {}{}{} drawn of {} ({} below horizon, {} too faint, {} outside field)",
        p.muted,
        p.reset,
        p.value,
        report.visibility.visible,
        p.reset,
        report.catalog_objects,
        report.visibility.below_horizon,
        report.visibility.too_faint,
        report.visibility.outside_field
    )?;
    writeln!(
        out,
        "  {}lines{}     {}",
        p.muted, p.reset, report.constellation_edges
    )?;
    writeln!(
        out,
        "  {}labels{}    {} placed, {} suppressed",
        p.muted, p.reset, report.labels_placed, report.labels_suppressed
    )?;

    let skipped = summary.load_rejections + report.rejected_objects;
    if skipped > 0 || report.icon_fallbacks > 0 {
        writeln!(
            out,
            "  {}warning{}   {} catalog records skipped, {} icon fallbacks",
            p.warn, p.reset, skipped, report.icon_fallbacks
        )?;
    }
    writeln!(
        out,
        "{}Completed in {}{}",
        p.muted,
        format_elapsed(summary.elapsed_ms),
        p.reset
    )?;
    Ok(())
}

fn format_elapsed(ms: u128) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.2}s", ms as f64 / 1000.0)
    }
}

//! Markdown rendering over an immutable judgment set.
//!
//! Section order is fixed: title, device details, frame rate, suggestions,
//! UI thread table, raster thread table, device performance table. Device
//! sections are left out entirely when no telemetry was supplied.

use std::fmt::Write as _;

use crate::report::judge::{Check, DeviceChecks, Judgments, Measured, Threshold, ThreadChecks};
use crate::report::model::FrameRateHistogram;

/// Status glyph for a passing check.
pub const PASS_GLYPH: &str = "✅";
/// Status glyph for a failing check.
pub const FAIL_GLYPH: &str = "❌";
/// Frame-rate section body when no bucket is above zero.
pub const NO_FRAME_RATE_DATA: &str = "No frame rate data";

const TITLE: &str = "# Performance Report";
const TABLE_HEADER: &str = "| Metric | Baseline | Measured | Status |\n| --- | --- | --- | --- |";

/// Render the complete report document.
#[must_use]
pub fn render_markdown(
    judgments: &Judgments,
    frame_rate: &FrameRateHistogram,
    frame_count: u64,
    rasterizer_count: u64,
) -> String {
    let mut out = String::with_capacity(4 * 1024);
    let _ = writeln!(out, "{TITLE}");

    if let Some(device) = &judgments.device {
        section(&mut out, "Device Details");
        let _ = writeln!(out, "- Operating System: {}", device.operating_system);
    }

    section(&mut out, "Frame Rate");
    render_frame_rate(&mut out, frame_rate);

    section(&mut out, "Suggestions");
    for suggestion in judgments.suggestions() {
        let _ = writeln!(out, "- {suggestion}");
    }

    section(&mut out, "UI Thread Performance");
    render_thread_table(&mut out, &judgments.build, frame_count);

    section(&mut out, "Raster Thread Performance");
    render_thread_table(&mut out, &judgments.raster, rasterizer_count);

    if let Some(device) = &judgments.device {
        section(&mut out, "Device Performance");
        render_device_table(&mut out, device);
    }

    out
}

fn section(out: &mut String, heading: &str) {
    let _ = write!(out, "\n## {heading}\n\n");
}

fn render_frame_rate(out: &mut String, frame_rate: &FrameRateHistogram) {
    let mut any = false;
    for (bucket, pct) in frame_rate.nonzero_entries() {
        any = true;
        let _ = writeln!(out, "- {bucket}: {pct:.2}%");
    }
    if !any {
        let _ = writeln!(out, "{NO_FRAME_RATE_DATA}");
    }
}

fn render_thread_table(out: &mut String, checks: &ThreadChecks, total_frames: u64) {
    let _ = writeln!(out, "{TABLE_HEADER}");
    for check in checks.rows() {
        table_row(out, check);
    }
    let _ = writeln!(out, "| Total Frames | - | {total_frames} | - |");
}

fn render_device_table(out: &mut String, device: &DeviceChecks) {
    let _ = writeln!(out, "{TABLE_HEADER}");
    for check in device.rows() {
        table_row(out, check);
    }
}

fn table_row(out: &mut String, check: &Check) {
    let _ = writeln!(
        out,
        "| {} | {} | {} | {} |",
        check.metric.label(),
        baseline_text(&check.threshold),
        measured_text(&check.actual),
        status_glyph(check.passed)
    );
}

/// Glyph for a judgment.
#[must_use]
pub const fn status_glyph(passed: bool) -> &'static str {
    if passed { PASS_GLYPH } else { FAIL_GLYPH }
}

/// Baseline column text.
#[must_use]
pub fn baseline_text(threshold: &Threshold) -> String {
    match threshold {
        Threshold::Millis { max } => format!("<= {max:.2} ms"),
        Threshold::MissedBudget {
            count_max,
            percent_max,
            percent_equivalent,
        } => format!(
            "<= {count_max} frames or <= {percent_max}% ({percent_equivalent} frames)"
        ),
        Threshold::Megabytes { max } => format!("<= {max:.2} MB"),
        Threshold::Samples { max } => format!("<= {max} samples"),
    }
}

/// Measured column text.
#[must_use]
pub fn measured_text(actual: &Measured) -> String {
    match actual {
        Measured::Millis(ms) => format!("{ms:.2} ms"),
        Measured::Frames(n) => format!("{n} frames"),
        Measured::Megabytes(mb) => format!("{mb:.2} MB"),
        Measured::Samples(n) => format!("{n} samples"),
    }
}

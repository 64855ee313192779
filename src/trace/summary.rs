//! Reduce a timeline to [`FrameStatistics`].

use crate::core::config::TraceConfig;
use crate::core::errors::{PerfError, Result};
use crate::report::model::FrameStatistics;
use crate::trace::refresh_rate::refresh_rate_histogram;
use crate::trace::timeline::Timeline;

/// UI-thread build span.
pub const BUILD_EVENT: &str = "Frame";
/// Raster-thread draw span.
pub const RASTER_EVENT: &str = "GPURasterizer::Draw";

/// Value at percentile `p` (0-100) of an ascending slice: `sorted[round((len - 1) * p / 100)]`.
///
/// Empty input yields zero.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p / 100.0).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Per-thread reduction of frame durations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ThreadSummary {
    p90: f64,
    p95: f64,
    p99: f64,
    average: f64,
    worst: f64,
    missed_budget: u64,
    count: u64,
}

impl ThreadSummary {
    #[allow(clippy::cast_precision_loss)]
    fn from_durations(mut durations: Vec<f64>, budget_ms: f64) -> Self {
        if durations.is_empty() {
            return Self::default();
        }
        durations.sort_by(f64::total_cmp);
        let count = durations.len() as u64;
        Self {
            p90: percentile(&durations, 90.0),
            p95: percentile(&durations, 95.0),
            p99: percentile(&durations, 99.0),
            average: durations.iter().sum::<f64>() / durations.len() as f64,
            worst: durations.last().copied().unwrap_or(0.0),
            missed_budget: durations.iter().filter(|d| **d > budget_ms).count() as u64,
            count,
        }
    }
}

/// Turns a completed timeline into frame statistics.
#[derive(Debug, Clone)]
pub struct TraceSummarizer {
    config: TraceConfig,
}

impl TraceSummarizer {
    /// Summarizer using the budgets and refresh-rate margin in `config`.
    #[must_use]
    pub fn new(config: TraceConfig) -> Self {
        Self { config }
    }

    /// Summarize `timeline`. Fails when it holds no UI build frames; missing
    /// raster frames leave the raster metrics at zero.
    pub fn summarize(&self, timeline: &Timeline) -> Result<FrameStatistics> {
        let build_durations = timeline.durations_millis(BUILD_EVENT);
        if build_durations.is_empty() {
            return Err(PerfError::EmptyTrace { event: BUILD_EVENT });
        }
        let build = ThreadSummary::from_durations(build_durations, self.config.build_budget_ms);
        let raster = ThreadSummary::from_durations(
            timeline.durations_millis(RASTER_EVENT),
            self.config.raster_budget_ms,
        );

        Ok(FrameStatistics {
            p90_build_ms: build.p90,
            p95_build_ms: build.p95,
            p99_build_ms: build.p99,
            average_build_ms: build.average,
            worst_build_ms: build.worst,
            missed_build_budget_count: build.missed_budget,
            p90_raster_ms: raster.p90,
            p95_raster_ms: raster.p95,
            p99_raster_ms: raster.p99,
            average_raster_ms: raster.average,
            worst_raster_ms: raster.worst,
            missed_raster_budget_count: raster.missed_budget,
            frame_count: build.count,
            frame_rasterizer_count: raster.count,
            frame_rate: refresh_rate_histogram(timeline, self.config.refresh_rate_margin_hz),
        })
    }
}

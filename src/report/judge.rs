//! Pass/fail judgments and the suggestions derived from them.
//!
//! Every metric is judged once, here. The status column of the rendered
//! tables and the suggestion list both read the same [`Check`] values, so the
//! two can never disagree about whether a metric is within budget.

use serde::Serialize;

use crate::report::baselines::PerformanceBaselines;
use crate::report::model::{DeviceSnapshot, FrameStatistics};

/// Sentence emitted when no rule fires.
pub const NO_ISSUES: &str = "No significant issues detected.";

/// Every judged metric, in suggestion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// UI thread, 90th percentile.
    P90Build,
    /// UI thread, 95th percentile.
    P95Build,
    /// UI thread, 99th percentile.
    P99Build,
    /// Raster thread, 90th percentile.
    P90Raster,
    /// Raster thread, 95th percentile.
    P95Raster,
    /// Raster thread, 99th percentile.
    P99Raster,
    /// UI frames over the build budget.
    MissedBuildBudget,
    /// Raster frames over the raster budget.
    MissedRasterBudget,
    /// Mean UI build time.
    AverageBuild,
    /// Slowest UI build.
    WorstBuild,
    /// Mean raster time.
    AverageRaster,
    /// Slowest raster frame.
    WorstRaster,
    /// CPU sample growth over the run.
    CpuUsageIncrease,
    /// Heap usage at the start of the run.
    InitialMemory,
    /// Heap usage at the end of the run.
    FinalMemory,
}

impl Metric {
    /// Row label used in the rendered tables.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::P90Build | Self::P90Raster => "90th Percentile Frame Time",
            Self::P95Build | Self::P95Raster => "95th Percentile Frame Time",
            Self::P99Build | Self::P99Raster => "99th Percentile Frame Time",
            Self::MissedBuildBudget | Self::MissedRasterBudget => "Skipped Frames",
            Self::AverageBuild | Self::AverageRaster => "Average Frame Time",
            Self::WorstBuild | Self::WorstRaster => "Worst Frame Time",
            Self::CpuUsageIncrease => "CPU Usage Increase",
            Self::InitialMemory => "Initial Memory Usage",
            Self::FinalMemory => "Final Memory Usage",
        }
    }
}

/// Threshold a metric is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Threshold {
    /// Duration ceiling.
    Millis {
        /// Inclusive limit, ms.
        max: f64,
    },
    /// Missed-budget rule: pass when within the count OR within the percentage.
    MissedBudget {
        /// Frames allowed over budget.
        count_max: u64,
        /// Share of frames (0-100) allowed over budget.
        percent_max: f64,
        /// `round(percent_max * total_frames / 100)`.
        percent_equivalent: u64,
    },
    /// Megabyte ceiling.
    Megabytes {
        /// Inclusive limit, MB.
        max: f64,
    },
    /// CPU sample-count growth ceiling.
    Samples {
        /// Inclusive limit on `final - initial`.
        max: u64,
    },
}

/// Measured value of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Measured {
    /// Duration, ms.
    Millis(f64),
    /// Frame count.
    Frames(u64),
    /// Heap usage, MB rounded to two decimals.
    Megabytes(f64),
    /// Signed CPU sample delta.
    Samples(i64),
}

/// One metric compared against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Check {
    /// What was judged.
    pub metric: Metric,
    /// Baseline it was judged against.
    pub threshold: Threshold,
    /// Value taken from the statistics or telemetry.
    pub actual: Measured,
    /// `actual` is within `threshold`.
    pub passed: bool,
}

impl Check {
    fn millis(metric: Metric, actual: f64, max: f64) -> Self {
        Self {
            metric,
            threshold: Threshold::Millis { max },
            actual: Measured::Millis(actual),
            passed: actual <= max,
        }
    }

    fn missed_budget(metric: Metric, missed: u64, total: u64, count_max: u64, percent_max: f64) -> Self {
        let percent_equivalent = percent_equivalent(percent_max, total);
        Self {
            metric,
            threshold: Threshold::MissedBudget {
                count_max,
                percent_max,
                percent_equivalent,
            },
            actual: Measured::Frames(missed),
            passed: missed <= count_max || missed <= percent_equivalent,
        }
    }

    fn megabytes(metric: Metric, actual: f64, max: f64) -> Self {
        // Compare the displayed two-decimal value so the glyph matches what is shown.
        let shown = round2(actual);
        Self {
            metric,
            threshold: Threshold::Megabytes { max },
            actual: Measured::Megabytes(shown),
            passed: shown <= max,
        }
    }

    fn samples(metric: Metric, delta: i64, max: u64) -> Self {
        Self {
            metric,
            threshold: Threshold::Samples { max },
            actual: Measured::Samples(delta),
            passed: u64::try_from(delta).map_or(true, |d| d <= max),
        }
    }
}

/// Frame-count equivalent of a percentage budget.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn percent_equivalent(percent_max: f64, total_frames: u64) -> u64 {
    let frames = (percent_max * total_frames as f64 / 100.0).round();
    if frames.is_finite() && frames > 0.0 {
        frames as u64
    } else {
        0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Checks for one of the two frame threads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct ThreadChecks {
    pub p90: Check,
    pub p95: Check,
    pub p99: Check,
    pub missed_budget: Check,
    pub average: Check,
    pub worst: Check,
}

impl ThreadChecks {
    /// Table order: percentiles, skipped frames, average, worst.
    #[must_use]
    pub fn rows(&self) -> [&Check; 6] {
        [
            &self.p90,
            &self.p95,
            &self.p99,
            &self.missed_budget,
            &self.average,
            &self.worst,
        ]
    }
}

/// Checks derived from device telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceChecks {
    /// Reported OS label, shown under Device Details.
    pub operating_system: String,
    /// Heap usage before the run.
    pub initial_memory: Check,
    /// Heap usage after the run.
    pub final_memory: Check,
    /// CPU sample growth.
    pub cpu_usage_increase: Check,
}

impl DeviceChecks {
    /// Table order: initial memory, final memory, CPU delta.
    #[must_use]
    pub fn rows(&self) -> [&Check; 3] {
        [
            &self.initial_memory,
            &self.final_memory,
            &self.cpu_usage_increase,
        ]
    }
}

/// Complete judgment set for one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Judgments {
    /// UI thread.
    pub build: ThreadChecks,
    /// Raster thread.
    pub raster: ThreadChecks,
    /// Present only when telemetry was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceChecks>,
}

impl Judgments {
    /// Judge `stats` (and `device`, when supplied) against `baselines`.
    #[must_use]
    pub fn evaluate(
        stats: &FrameStatistics,
        baselines: &PerformanceBaselines,
        device: Option<&DeviceSnapshot>,
    ) -> Self {
        let b = baselines;
        let build = ThreadChecks {
            p90: Check::millis(Metric::P90Build, stats.p90_build_ms, b.p90_build_ms),
            p95: Check::millis(Metric::P95Build, stats.p95_build_ms, b.p95_build_ms),
            p99: Check::millis(Metric::P99Build, stats.p99_build_ms, b.p99_build_ms),
            missed_budget: Check::missed_budget(
                Metric::MissedBuildBudget,
                stats.missed_build_budget_count,
                stats.frame_count,
                b.missed_build_budget_count_max,
                b.missed_build_budget_percent_max,
            ),
            average: Check::millis(Metric::AverageBuild, stats.average_build_ms, b.average_build_ms),
            worst: Check::millis(Metric::WorstBuild, stats.worst_build_ms, b.worst_build_ms),
        };
        // Raster percentiles reuse the build percentile thresholds.
        let raster = ThreadChecks {
            p90: Check::millis(Metric::P90Raster, stats.p90_raster_ms, b.p90_build_ms),
            p95: Check::millis(Metric::P95Raster, stats.p95_raster_ms, b.p95_build_ms),
            p99: Check::millis(Metric::P99Raster, stats.p99_raster_ms, b.p99_build_ms),
            missed_budget: Check::missed_budget(
                Metric::MissedRasterBudget,
                stats.missed_raster_budget_count,
                stats.frame_rasterizer_count,
                b.missed_raster_budget_count_max,
                b.missed_raster_budget_percent_max,
            ),
            average: Check::millis(
                Metric::AverageRaster,
                stats.average_raster_ms,
                b.average_build_ms,
            ),
            worst: Check::millis(Metric::WorstRaster, stats.worst_raster_ms, b.worst_build_ms),
        };
        let device = device.map(|d| DeviceChecks {
            operating_system: d.operating_system.clone(),
            initial_memory: Check::megabytes(
                Metric::InitialMemory,
                d.before.heap_usage_mb(),
                b.memory_usage_mb_max,
            ),
            final_memory: Check::megabytes(
                Metric::FinalMemory,
                d.after.heap_usage_mb(),
                b.memory_usage_mb_max,
            ),
            cpu_usage_increase: Check::samples(
                Metric::CpuUsageIncrease,
                d.cpu_sample_delta(),
                b.cpu_usage_increase_max,
            ),
        });

        Self {
            build,
            raster,
            device,
        }
    }

    /// Checks feeding the suggestion list, in suggestion order.
    ///
    /// Memory checks appear only in the device table.
    #[must_use]
    pub fn suggestion_checks(&self) -> Vec<&Check> {
        let mut checks = vec![
            &self.build.p90,
            &self.build.p95,
            &self.build.p99,
            &self.raster.p90,
            &self.raster.p95,
            &self.raster.p99,
            &self.build.missed_budget,
            &self.raster.missed_budget,
            &self.build.average,
            &self.build.worst,
            &self.raster.average,
            &self.raster.worst,
        ];
        if let Some(device) = &self.device {
            checks.push(&device.cpu_usage_increase);
        }
        checks
    }

    /// Every check, tables included.
    pub fn all(&self) -> impl Iterator<Item = &Check> {
        self.build
            .rows()
            .into_iter()
            .chain(self.raster.rows())
            .chain(self.device.iter().flat_map(DeviceChecks::rows))
    }

    /// Checks that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.all().filter(|check| !check.passed)
    }

    /// Whether every check passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.all().all(|check| check.passed)
    }

    /// Suggestions for every failing rule, or the single no-issues sentence.
    #[must_use]
    pub fn suggestions(&self) -> Vec<String> {
        let suggestions: Vec<String> = self
            .suggestion_checks()
            .into_iter()
            .filter(|check| !check.passed)
            .filter_map(suggestion_for)
            .collect();
        if suggestions.is_empty() {
            vec![NO_ISSUES.to_string()]
        } else {
            suggestions
        }
    }
}

fn suggestion_for(check: &Check) -> Option<String> {
    let text = match (check.metric, check.actual) {
        (Metric::P90Build | Metric::P95Build | Metric::P99Build, Measured::Millis(ms)) => format!(
            "{} build time is {ms:.2} ms. Investigate heavy widget rebuilds and move expensive \
             work out of build methods.",
            percentile_name(check.metric)
        ),
        (Metric::P90Raster | Metric::P95Raster | Metric::P99Raster, Measured::Millis(ms)) => {
            format!(
                "{} raster time is {ms:.2} ms. Simplify visuals: reduce layers, clipping, \
                 opacity and shader effects.",
                percentile_name(check.metric)
            )
        }
        (Metric::MissedBuildBudget, Measured::Frames(n)) => format!(
            "{n} UI frames missed the build budget. Split long synchronous work and avoid \
             rebuilding large subtrees every frame."
        ),
        (Metric::MissedRasterBudget, Measured::Frames(n)) => format!(
            "{n} frames missed the raster budget. Reduce saveLayer calls and cache static \
             content with RepaintBoundary."
        ),
        (Metric::AverageBuild, Measured::Millis(ms)) => format!(
            "Average build time is {ms:.2} ms. Use const constructors and narrow the scope of \
             state changes."
        ),
        (Metric::WorstBuild, Measured::Millis(ms)) => format!(
            "Worst build time is {ms:.2} ms. Profile the slowest frame for expensive layout or \
             synchronous I/O."
        ),
        (Metric::AverageRaster, Measured::Millis(ms)) => format!(
            "Average raster time is {ms:.2} ms. Reduce overdraw and image decoding cost."
        ),
        (Metric::WorstRaster, Measured::Millis(ms)) => format!(
            "Worst raster time is {ms:.2} ms. Look for shader compilation jank and precache \
             expensive effects."
        ),
        (Metric::CpuUsageIncrease, Measured::Samples(n)) => format!(
            "CPU usage increased by {n} samples. Use a CPU profiler to locate hot code paths."
        ),
        _ => return None,
    };
    Some(text)
}

const fn percentile_name(metric: Metric) -> &'static str {
    match metric {
        Metric::P90Build | Metric::P90Raster => "90th percentile",
        Metric::P95Build | Metric::P95Raster => "95th percentile",
        _ => "99th percentile",
    }
}

//! Typed data model for frame statistics, device telemetry, and the JSON
//! document handed over by the trace collector.
//!
//! The wire shape mirrors what the collector emits:
//!
//! ```json
//! {
//!   "performance": { "90th_percentile_frame_build_time_millis": 5.1, "...": 0 },
//!   "frame_rate_info": { "60Hz": 98.5, "120Hz": 1.5 },
//!   "device_details": { "operating_system": "android" },
//!   "cpu_usage": { "initial": { "total_cpu_samples": 10 }, "final": { "total_cpu_samples": 90 } },
//!   "memory_usage": {
//!     "initial": { "memory_usage": { "heapUsage": 1048576 } },
//!     "final": { "memory_usage": { "heapUsage": 2097152 } }
//!   }
//! }
//! ```
//!
//! Optionality is declared per field; the device group is present when any of
//! its three keys is present, and missing readings inside it become zero at
//! use sites rather than errors.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::core::errors::{PerfError, Result};

/// Label used when the collector could not determine the operating system.
pub const UNKNOWN_OS: &str = "Unknown OS";

const BYTES_PER_MB: f64 = 1_048_576.0;

// ──────────────────── frame-rate histogram ────────────────────

/// Refresh rates a frame interval can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameRateBucket {
    Hz30,
    Hz60,
    Hz80,
    Hz90,
    Hz120,
}

impl FrameRateBucket {
    /// Every bucket in render order.
    pub const ALL: [Self; 5] = [Self::Hz30, Self::Hz60, Self::Hz80, Self::Hz90, Self::Hz120];

    /// Nominal refresh rate in Hz.
    #[must_use]
    pub const fn hz(self) -> f64 {
        match self {
            Self::Hz30 => 30.0,
            Self::Hz60 => 60.0,
            Self::Hz80 => 80.0,
            Self::Hz90 => 90.0,
            Self::Hz120 => 120.0,
        }
    }

    /// Label used both on the wire and in the rendered report.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hz30 => "30Hz",
            Self::Hz60 => "60Hz",
            Self::Hz80 => "80Hz",
            Self::Hz90 => "90Hz",
            Self::Hz120 => "120Hz",
        }
    }
}

impl std::fmt::Display for FrameRateBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Percentage of frames consistent with each refresh rate.
///
/// Absent entries read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameRateHistogram {
    #[serde(rename = "30Hz", default, skip_serializing_if = "Option::is_none")]
    pub hz30: Option<f64>,
    #[serde(rename = "60Hz", default, skip_serializing_if = "Option::is_none")]
    pub hz60: Option<f64>,
    #[serde(rename = "80Hz", default, skip_serializing_if = "Option::is_none")]
    pub hz80: Option<f64>,
    #[serde(rename = "90Hz", default, skip_serializing_if = "Option::is_none")]
    pub hz90: Option<f64>,
    #[serde(rename = "120Hz", default, skip_serializing_if = "Option::is_none")]
    pub hz120: Option<f64>,
    /// Frames whose interval matched no bucket.
    #[serde(
        rename = "frames_with_illegal_refresh_rate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub illegal_frame_count: Option<u64>,
}

impl FrameRateHistogram {
    /// Percentage recorded for `bucket`, zero when absent.
    #[must_use]
    pub fn get(&self, bucket: FrameRateBucket) -> f64 {
        self.slot(bucket).unwrap_or(0.0)
    }

    /// Record the percentage for `bucket`.
    pub fn set(&mut self, bucket: FrameRateBucket, percentage: f64) {
        let slot = match bucket {
            FrameRateBucket::Hz30 => &mut self.hz30,
            FrameRateBucket::Hz60 => &mut self.hz60,
            FrameRateBucket::Hz80 => &mut self.hz80,
            FrameRateBucket::Hz90 => &mut self.hz90,
            FrameRateBucket::Hz120 => &mut self.hz120,
        };
        *slot = Some(percentage);
    }

    /// Entries strictly above zero, in fixed 30/60/80/90/120 Hz order.
    pub fn nonzero_entries(&self) -> impl Iterator<Item = (FrameRateBucket, f64)> + '_ {
        FrameRateBucket::ALL
            .into_iter()
            .map(|bucket| (bucket, self.get(bucket)))
            .filter(|(_, pct)| *pct > 0.0)
    }

    const fn slot(&self, bucket: FrameRateBucket) -> Option<f64> {
        match bucket {
            FrameRateBucket::Hz30 => self.hz30,
            FrameRateBucket::Hz60 => self.hz60,
            FrameRateBucket::Hz80 => self.hz80,
            FrameRateBucket::Hz90 => self.hz90,
            FrameRateBucket::Hz120 => self.hz120,
        }
    }
}

// ──────────────────── frame statistics ────────────────────

/// Reduced frame-timing statistics for one completed trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameStatistics {
    #[serde(rename = "90th_percentile_frame_build_time_millis")]
    pub p90_build_ms: f64,
    #[serde(rename = "95th_percentile_frame_build_time_millis")]
    pub p95_build_ms: f64,
    #[serde(rename = "99th_percentile_frame_build_time_millis")]
    pub p99_build_ms: f64,
    #[serde(rename = "average_frame_build_time_millis")]
    pub average_build_ms: f64,
    #[serde(rename = "worst_frame_build_time_millis")]
    pub worst_build_ms: f64,
    #[serde(rename = "missed_frame_build_budget_count")]
    pub missed_build_budget_count: u64,

    #[serde(rename = "90th_percentile_frame_rasterizer_time_millis")]
    pub p90_raster_ms: f64,
    #[serde(rename = "95th_percentile_frame_rasterizer_time_millis")]
    pub p95_raster_ms: f64,
    #[serde(rename = "99th_percentile_frame_rasterizer_time_millis")]
    pub p99_raster_ms: f64,
    #[serde(rename = "average_frame_rasterizer_time_millis")]
    pub average_raster_ms: f64,
    #[serde(rename = "worst_frame_rasterizer_time_millis")]
    pub worst_raster_ms: f64,
    #[serde(rename = "missed_frame_rasterizer_budget_count")]
    pub missed_raster_budget_count: u64,

    /// UI-thread frames in the trace.
    #[serde(rename = "frame_count")]
    pub frame_count: u64,
    /// Raster-thread frames in the trace.
    #[serde(rename = "frame_rasterizer_count")]
    pub frame_rasterizer_count: u64,

    /// Travels under `frame_rate_info` on the wire, not inside `performance`.
    #[serde(skip)]
    pub frame_rate: FrameRateHistogram,
}

// ──────────────────── device telemetry ────────────────────

/// One telemetry reading taken before or after the interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryReading {
    /// Heap usage in bytes; some platforms report none.
    pub heap_usage_bytes: Option<u64>,
    /// Cumulative CPU sample counter.
    pub cpu_samples: Option<i64>,
}

impl TelemetryReading {
    /// Heap usage in megabytes, zero when not reported.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn heap_usage_mb(&self) -> f64 {
        self.heap_usage_bytes.unwrap_or(0) as f64 / BYTES_PER_MB
    }
}

/// Before/after device telemetry plus the OS label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    pub operating_system: String,
    pub before: TelemetryReading,
    pub after: TelemetryReading,
}

impl DeviceSnapshot {
    /// `after - before` CPU samples; missing counters count as zero and the
    /// result is not clamped.
    #[must_use]
    pub fn cpu_sample_delta(&self) -> i64 {
        self.after
            .cpu_samples
            .unwrap_or(0)
            .saturating_sub(self.before.cpu_samples.unwrap_or(0))
    }
}

// ──────────────────── wire contract ────────────────────

/// `{"initial": ..., "final": ...}` pair on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phased<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<T>,
    #[serde(rename = "final", default, skip_serializing_if = "Option::is_none")]
    pub final_: Option<T>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cpu_samples: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapUsage {
    #[serde(rename = "heapUsage", default, skip_serializing_if = "Option::is_none")]
    pub heap_usage: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<HeapUsage>,
}

/// The optional device group of the input document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_details: Option<DeviceDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<Phased<CpuSample>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<Phased<MemorySample>>,
}

impl DeviceSection {
    /// Whether any device key was supplied.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.device_details.is_some() || self.cpu_usage.is_some() || self.memory_usage.is_some()
    }

    /// Collapse the wire group into a snapshot, or `None` when the group is absent.
    #[must_use]
    pub fn to_snapshot(&self) -> Option<DeviceSnapshot> {
        if !self.is_present() {
            return None;
        }

        let operating_system = self
            .device_details
            .as_ref()
            .and_then(|details| details.operating_system.clone())
            .unwrap_or_else(|| UNKNOWN_OS.to_string());
        let cpu = self.cpu_usage.clone().unwrap_or_default();
        let memory = self.memory_usage.clone().unwrap_or_default();

        let reading = |cpu: Option<CpuSample>, memory: Option<MemorySample>| TelemetryReading {
            heap_usage_bytes: memory
                .and_then(|m| m.memory_usage)
                .and_then(|h| h.heap_usage),
            cpu_samples: cpu.and_then(|c| c.total_cpu_samples),
        };

        Some(DeviceSnapshot {
            operating_system,
            before: reading(cpu.initial, memory.initial),
            after: reading(cpu.final_, memory.final_),
        })
    }

    /// Inverse of [`DeviceSection::to_snapshot`].
    #[must_use]
    pub fn from_snapshot(device: Option<&DeviceSnapshot>) -> Self {
        let Some(device) = device else {
            return Self::default();
        };
        let cpu = |r: &TelemetryReading| CpuSample {
            total_cpu_samples: r.cpu_samples,
        };
        let memory = |r: &TelemetryReading| MemorySample {
            memory_usage: Some(HeapUsage {
                heap_usage: r.heap_usage_bytes,
            }),
        };
        Self {
            device_details: Some(DeviceDetails {
                operating_system: Some(device.operating_system.clone()),
            }),
            cpu_usage: Some(Phased {
                initial: Some(cpu(&device.before)),
                final_: Some(cpu(&device.after)),
            }),
            memory_usage: Some(Phased {
                initial: Some(memory(&device.before)),
                final_: Some(memory(&device.after)),
            }),
        }
    }
}

/// Complete input document accepted by the report generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    pub performance: FrameStatistics,
    #[serde(default)]
    pub frame_rate_info: FrameRateHistogram,
    #[serde(flatten)]
    pub device: DeviceSection,
}

impl ReportInput {
    /// Build the wire document from typed parts.
    #[must_use]
    pub fn new(stats: &FrameStatistics, device: Option<&DeviceSnapshot>) -> Self {
        let mut performance = stats.clone();
        let frame_rate_info = std::mem::take(&mut performance.frame_rate);
        Self {
            performance,
            frame_rate_info,
            device: DeviceSection::from_snapshot(device),
        }
    }

    /// Parse the JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|error| PerfError::ReportInput {
            details: error.to_string(),
        })
    }

    /// Split into statistics (histogram attached) and the optional device snapshot.
    #[must_use]
    pub fn into_parts(self) -> (FrameStatistics, Option<DeviceSnapshot>) {
        let device = self.device.to_snapshot();
        let mut stats = self.performance;
        stats.frame_rate = self.frame_rate_info;
        (stats, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERFORMANCE: &str = r#"{
        "90th_percentile_frame_build_time_millis": 5.0,
        "95th_percentile_frame_build_time_millis": 6.0,
        "99th_percentile_frame_build_time_millis": 9.5,
        "average_frame_build_time_millis": 3.2,
        "worst_frame_build_time_millis": 14.0,
        "missed_frame_build_budget_count": 1,
        "90th_percentile_frame_rasterizer_time_millis": 4.0,
        "95th_percentile_frame_rasterizer_time_millis": 4.5,
        "99th_percentile_frame_rasterizer_time_millis": 7.0,
        "average_frame_rasterizer_time_millis": 2.1,
        "worst_frame_rasterizer_time_millis": 11.0,
        "missed_frame_rasterizer_budget_count": 0,
        "frame_count": 120,
        "frame_rasterizer_count": 118
    }"#;

    fn document(extra: &str) -> String {
        format!(r#"{{"performance": {PERFORMANCE}{extra}}}"#)
    }

    #[test]
    fn performance_only_has_no_device() {
        let input = ReportInput::from_json(&document("")).unwrap();
        let (stats, device) = input.into_parts();
        assert!(device.is_none());
        assert_eq!(stats.frame_count, 120);
        assert_eq!(stats.frame_rasterizer_count, 118);
        assert!((stats.p99_build_ms - 9.5).abs() < f64::EPSILON);
        assert_eq!(stats.frame_rate, FrameRateHistogram::default());
    }

    #[test]
    fn frame_rate_info_attached_to_stats() {
        let input =
            ReportInput::from_json(&document(r#", "frame_rate_info": {"60Hz": 90.0, "120Hz": 10.0}"#))
                .unwrap();
        let (stats, _) = input.into_parts();
        assert!((stats.frame_rate.get(FrameRateBucket::Hz60) - 90.0).abs() < f64::EPSILON);
        assert!(stats.frame_rate.get(FrameRateBucket::Hz30).abs() < f64::EPSILON);
        let labels: Vec<&str> = stats
            .frame_rate
            .nonzero_entries()
            .map(|(bucket, _)| bucket.label())
            .collect();
        assert_eq!(labels, vec!["60Hz", "120Hz"]);
    }

    #[test]
    fn device_group_with_only_os_reads_zeroes() {
        let input = ReportInput::from_json(&document(
            r#", "device_details": {"operating_system": "ios"}"#,
        ))
        .unwrap();
        let (_, device) = input.into_parts();
        let device = device.unwrap();
        assert_eq!(device.operating_system, "ios");
        assert_eq!(device.before, TelemetryReading::default());
        assert!(device.after.heap_usage_mb().abs() < f64::EPSILON);
        assert_eq!(device.cpu_sample_delta(), 0);
    }

    #[test]
    fn device_group_without_details_reports_unknown_os() {
        let input = ReportInput::from_json(&document(
            r#", "cpu_usage": {"initial": {"total_cpu_samples": 40}, "final": {"total_cpu_samples": 25}}"#,
        ))
        .unwrap();
        let (_, device) = input.into_parts();
        let device = device.unwrap();
        assert_eq!(device.operating_system, UNKNOWN_OS);
        assert_eq!(device.cpu_sample_delta(), -15);
    }

    #[test]
    fn heap_usage_parsed_from_nested_shape() {
        let input = ReportInput::from_json(&document(
            r#", "memory_usage": {
                "initial": {"memory_usage": {"heapUsage": 104857600}},
                "final": {"memory_usage": {}}
            }"#,
        ))
        .unwrap();
        let (_, device) = input.into_parts();
        let device = device.unwrap();
        assert!((device.before.heap_usage_mb() - 100.0).abs() < 1e-9);
        assert_eq!(device.after.heap_usage_bytes, None);
    }

    #[test]
    fn missing_required_statistic_is_rejected() {
        let err = ReportInput::from_json(r#"{"performance": {"frame_count": 3}}"#).unwrap_err();
        assert_eq!(err.code(), "FPR-2003");
    }

    #[test]
    fn wire_document_preserves_parts() {
        let input = ReportInput::from_json(&document(
            r#", "frame_rate_info": {"90Hz": 100.0},
                "device_details": {"operating_system": "android"},
                "cpu_usage": {"initial": {"total_cpu_samples": 1}, "final": {"total_cpu_samples": 9}},
                "memory_usage": {
                    "initial": {"memory_usage": {"heapUsage": 1}},
                    "final": {"memory_usage": {"heapUsage": 2}}
                }"#,
        ))
        .unwrap();
        let (stats, device) = input.clone().into_parts();
        assert_eq!(ReportInput::new(&stats, device.as_ref()), input);
    }
}

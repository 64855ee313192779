//! Baseline thresholds a report run is judged against.

use serde::{Deserialize, Serialize};

use crate::core::errors::{PerfError, Result};

/// Frame-timing and device thresholds for one report run.
///
/// Values are taken as-is: a percentage above 100 or a p90 larger than p95 is
/// accepted and only changes which comparison ends up more permissive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerformanceBaselines {
    /// 90th percentile UI build time, ms.
    pub p90_build_ms: f64,
    /// 95th percentile UI build time, ms.
    pub p95_build_ms: f64,
    /// 99th percentile UI build time, ms.
    pub p99_build_ms: f64,
    /// Absolute count of UI frames allowed over budget.
    pub missed_build_budget_count_max: u64,
    /// Share of UI frames (0-100) allowed over budget.
    pub missed_build_budget_percent_max: f64,
    /// Absolute count of raster frames allowed over budget.
    pub missed_raster_budget_count_max: u64,
    /// Share of raster frames (0-100) allowed over budget.
    pub missed_raster_budget_percent_max: f64,
    /// Average frame time, ms. Applied to both build and raster.
    pub average_build_ms: f64,
    /// Worst frame time, ms. Applied to both build and raster.
    pub worst_build_ms: f64,
    /// Heap usage ceiling, MB. Applied to the initial and final readings.
    pub memory_usage_mb_max: f64,
    /// Allowed growth of the cumulative CPU sample counter.
    pub cpu_usage_increase_max: u64,
}

impl Default for PerformanceBaselines {
    fn default() -> Self {
        Self {
            p90_build_ms: 6.0,
            p95_build_ms: 8.0,
            p99_build_ms: 12.0,
            missed_build_budget_count_max: 2,
            missed_build_budget_percent_max: 2.5,
            missed_raster_budget_count_max: 2,
            missed_raster_budget_percent_max: 2.5,
            average_build_ms: 4.0,
            worst_build_ms: 16.0,
            memory_usage_mb_max: 200.0,
            cpu_usage_increase_max: 1_000,
        }
    }
}

impl PerformanceBaselines {
    /// Reject negative or non-finite thresholds. Nothing else is checked.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("p90_build_ms", self.p90_build_ms),
            ("p95_build_ms", self.p95_build_ms),
            ("p99_build_ms", self.p99_build_ms),
            (
                "missed_build_budget_percent_max",
                self.missed_build_budget_percent_max,
            ),
            (
                "missed_raster_budget_percent_max",
                self.missed_raster_budget_percent_max,
            ),
            ("average_build_ms", self.average_build_ms),
            ("worst_build_ms", self.worst_build_ms),
            ("memory_usage_mb_max", self.memory_usage_mb_max),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PerfError::InvalidConfig {
                    details: format!("baselines.{name} must be a finite value >= 0.0, got {value}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        PerformanceBaselines::default().validate().unwrap();
    }

    #[test]
    fn negative_threshold_rejected() {
        let baselines = PerformanceBaselines {
            worst_build_ms: -1.0,
            ..PerformanceBaselines::default()
        };
        let err = baselines.validate().unwrap_err();
        assert_eq!(err.code(), "FPR-1001");
        assert!(err.to_string().contains("worst_build_ms"));
    }

    #[test]
    fn nan_threshold_rejected() {
        let baselines = PerformanceBaselines {
            p95_build_ms: f64::NAN,
            ..PerformanceBaselines::default()
        };
        assert!(baselines.validate().is_err());
    }

    #[test]
    fn unordered_and_oversized_values_accepted() {
        let baselines = PerformanceBaselines {
            p90_build_ms: 20.0,
            p95_build_ms: 10.0,
            missed_build_budget_percent_max: 250.0,
            ..PerformanceBaselines::default()
        };
        baselines.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let baselines: PerformanceBaselines = toml::from_str("p90_build_ms = 7.5\n").unwrap();
        assert!((baselines.p90_build_ms - 7.5).abs() < f64::EPSILON);
        assert_eq!(baselines.missed_build_budget_count_max, 2);
        assert!((baselines.memory_usage_mb_max - 200.0).abs() < f64::EPSILON);
    }
}

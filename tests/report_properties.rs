//! Property-based tests for report judgment and rendering invariants.
//!
//! Arbitrary frame statistics, device telemetry and baselines must always
//! produce glyphs that agree with the comparison rules, a suggestion list that
//! is never empty, and byte-identical output for identical input.

use proptest::prelude::*;

use frame_perf_report::report::baselines::PerformanceBaselines;
use frame_perf_report::report::generate_report;
use frame_perf_report::report::judge::{Judgments, Measured, NO_ISSUES, Threshold, percent_equivalent};
use frame_perf_report::report::model::{DeviceSnapshot, FrameStatistics, TelemetryReading};
use frame_perf_report::report::render::{FAIL_GLYPH, PASS_GLYPH};
use frame_perf_report::trace::summary::percentile;

// ──────────────────── strategies ────────────────────

fn arb_millis() -> impl Strategy<Value = f64> {
    prop_oneof![
        (0u32..4_000).prop_map(|n| f64::from(n) / 100.0),
        // Land exactly on the default thresholds now and then.
        prop::sample::select(vec![4.0, 6.0, 8.0, 12.0, 16.0]),
    ]
}

fn arb_stats() -> impl Strategy<Value = FrameStatistics> {
    (
        prop::collection::vec(arb_millis(), 10),
        0u64..5_000,
        0u64..5_000,
        0u64..200,
        0u64..200,
    )
        .prop_map(|(ms, frames, raster_frames, missed, missed_raster)| FrameStatistics {
            p90_build_ms: ms[0],
            p95_build_ms: ms[1],
            p99_build_ms: ms[2],
            average_build_ms: ms[3],
            worst_build_ms: ms[4],
            missed_build_budget_count: missed,
            p90_raster_ms: ms[5],
            p95_raster_ms: ms[6],
            p99_raster_ms: ms[7],
            average_raster_ms: ms[8],
            worst_raster_ms: ms[9],
            missed_raster_budget_count: missed_raster,
            frame_count: frames,
            frame_rasterizer_count: raster_frames,
            ..FrameStatistics::default()
        })
}

fn arb_reading() -> impl Strategy<Value = TelemetryReading> {
    (
        prop::option::of(0u64..600 * 1024 * 1024),
        prop::option::of(0i64..5_000),
    )
        .prop_map(|(heap_usage_bytes, cpu_samples)| TelemetryReading {
            heap_usage_bytes,
            cpu_samples,
        })
}

fn arb_device() -> impl Strategy<Value = Option<DeviceSnapshot>> {
    prop::option::of(
        (
            prop::sample::select(vec!["android", "ios", "macos"]),
            arb_reading(),
            arb_reading(),
        )
            .prop_map(|(os, before, after)| DeviceSnapshot {
                operating_system: os.to_string(),
                before,
                after,
            }),
    )
}

// ──────────────────── property tests ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every check passes exactly when its measured value is within the baseline.
    #[test]
    fn verdicts_follow_comparison_rules(stats in arb_stats(), device in arb_device()) {
        let judgments = Judgments::evaluate(&stats, &PerformanceBaselines::default(), device.as_ref());
        for check in judgments.all() {
            let expected = match (check.threshold, check.actual) {
                (Threshold::Millis { max }, Measured::Millis(ms)) => ms <= max,
                (Threshold::Megabytes { max }, Measured::Megabytes(mb)) => mb <= max,
                (Threshold::Samples { max }, Measured::Samples(delta)) => {
                    delta < 0 || delta.unsigned_abs() <= max
                }
                (
                    Threshold::MissedBudget { count_max, percent_equivalent, .. },
                    Measured::Frames(missed),
                ) => missed <= count_max || missed <= percent_equivalent,
                (threshold, actual) => {
                    return Err(TestCaseError::fail(format!(
                        "mismatched threshold {threshold:?} and measurement {actual:?}"
                    )));
                }
            };
            prop_assert_eq!(check.passed, expected, "{:?}", check.metric);
        }
    }

    /// The missed-budget allowance is the larger of the count and percent limits.
    #[test]
    fn missed_budget_uses_either_limit(stats in arb_stats()) {
        let baselines = PerformanceBaselines::default();
        let judgments = Judgments::evaluate(&stats, &baselines, None);
        let allowed = baselines.missed_build_budget_count_max.max(percent_equivalent(
            baselines.missed_build_budget_percent_max,
            stats.frame_count,
        ));
        prop_assert_eq!(
            judgments.build.missed_budget.passed,
            stats.missed_build_budget_count <= allowed
        );
    }

    /// The no-issues sentence appears alone, and only when no suggestion rule fails.
    #[test]
    fn no_issues_sentence_iff_suggestion_rules_pass(stats in arb_stats(), device in arb_device()) {
        let judgments = Judgments::evaluate(&stats, &PerformanceBaselines::default(), device.as_ref());
        let suggestions = judgments.suggestions();
        let clean = judgments.suggestion_checks().iter().all(|check| check.passed);
        prop_assert!(!suggestions.is_empty());
        prop_assert_eq!(suggestions == vec![NO_ISSUES.to_string()], clean);
        prop_assert_eq!(suggestions.iter().any(|s| s == NO_ISSUES), clean);
    }

    /// Glyph counts in the markdown match the judgments behind them.
    #[test]
    fn glyphs_match_judgments(stats in arb_stats(), device in arb_device()) {
        let report = generate_report(&stats, &PerformanceBaselines::default(), device.as_ref());
        let passed = report.judgments.all().filter(|check| check.passed).count();
        let failed = report.judgments.all().count() - passed;
        prop_assert_eq!(report.markdown.matches(PASS_GLYPH).count(), passed);
        prop_assert_eq!(report.markdown.matches(FAIL_GLYPH).count(), failed);
        prop_assert_eq!(report.passed(), failed == 0);
    }

    /// Device sections appear exactly when telemetry is supplied.
    #[test]
    fn device_sections_track_telemetry(stats in arb_stats(), device in arb_device()) {
        let report = generate_report(&stats, &PerformanceBaselines::default(), device.as_ref());
        let present = device.is_some();
        prop_assert_eq!(report.markdown.contains("## Device Details"), present);
        prop_assert_eq!(report.markdown.contains("## Device Performance"), present);
        prop_assert_eq!(report.judgments.all().count(), if present { 15 } else { 12 });
    }

    /// Identical inputs render byte-identical reports.
    #[test]
    fn rendering_is_deterministic(stats in arb_stats(), device in arb_device()) {
        let baselines = PerformanceBaselines::default();
        let first = generate_report(&stats, &baselines, device.as_ref());
        let second = generate_report(&stats.clone(), &baselines.clone(), device.clone().as_ref());
        prop_assert_eq!(first.markdown, second.markdown);
    }

    /// Percentiles are members of the sample and monotone in `p`.
    #[test]
    fn percentile_is_monotone(mut samples in prop::collection::vec(arb_millis(), 1..200)) {
        samples.sort_by(f64::total_cmp);
        let p90 = percentile(&samples, 90.0);
        let p95 = percentile(&samples, 95.0);
        let p99 = percentile(&samples, 99.0);
        prop_assert!(p90 <= p95 && p95 <= p99);
        prop_assert!(samples.contains(&p99));
        prop_assert!(p99 <= samples[samples.len() - 1]);
    }
}

//! Refresh-rate histogram from vsync callbacks.

use crate::report::model::{FrameRateBucket, FrameRateHistogram};
use crate::trace::timeline::{Phase, Timeline};

/// Engine event carrying the vsync start and target times in its args.
pub const VSYNC_EVENT: &str = "VsyncProcessCallback";

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Bucket a refresh rate to the first nominal rate (ascending) strictly
/// within `margin_hz`.
///
/// 80 Hz and 90 Hz sit closer than two margins apart, so a rate between them
/// lands in 80 Hz even when 90 Hz is nearer.
#[must_use]
pub fn classify(rate_hz: f64, margin_hz: f64) -> Option<FrameRateBucket> {
    FrameRateBucket::ALL
        .into_iter()
        .find(|bucket| (rate_hz - bucket.hz()).abs() < margin_hz)
}

/// Percentage of vsync frames per bucket.
///
/// Every bucket is populated (possibly with zero) once any vsync frame was
/// seen; a timeline without vsync callbacks yields an empty histogram.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn refresh_rate_histogram(timeline: &Timeline, margin_hz: f64) -> FrameRateHistogram {
    let mut counts = [0_u64; FrameRateBucket::ALL.len()];
    let mut illegal = 0_u64;
    let mut total = 0_u64;

    for event in timeline.named(VSYNC_EVENT) {
        if !matches!(event.phase, Phase::Begin | Phase::Complete) {
            continue;
        }
        let (Some(start), Some(target)) = (
            event.numeric_arg("StartTime"),
            event.numeric_arg("TargetTime"),
        ) else {
            continue;
        };
        total += 1;
        let interval = target - start;
        let bucket = (interval > 0.0)
            .then(|| MICROS_PER_SECOND / interval)
            .and_then(|rate| classify(rate, margin_hz));
        match bucket {
            Some(bucket) => counts[bucket as usize] += 1,
            None => illegal += 1,
        }
    }

    let mut histogram = FrameRateHistogram::default();
    if total == 0 {
        return histogram;
    }
    for bucket in FrameRateBucket::ALL {
        histogram.set(bucket, counts[bucket as usize] as f64 * 100.0 / total as f64);
    }
    histogram.illegal_frame_count = Some(illegal);
    histogram
}

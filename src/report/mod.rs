//! Report generator: judges frame statistics and device telemetry against
//! baselines and renders the markdown report.
//!
//! [`generate_report`] is pure. Identical inputs produce byte-identical
//! markdown; timestamps belong in the filename chosen by the caller, never in
//! the body. Persisting is a separate step ([`store::save_report`]).

pub mod baselines;
pub mod judge;
pub mod model;
pub mod render;
pub mod store;

use serde::Serialize;

use crate::report::baselines::PerformanceBaselines;
use crate::report::judge::{Check, Judgments};
use crate::report::model::{DeviceSnapshot, FrameStatistics};

/// Rendered report plus the judgments behind its status glyphs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Complete markdown document.
    pub markdown: String,
    /// Checks behind every status glyph and suggestion.
    pub judgments: Judgments,
}

impl Report {
    /// Whether every table row passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.judgments.passed()
    }

    /// Failing checks, in table order.
    #[must_use]
    pub fn failures(&self) -> Vec<&Check> {
        self.judgments.failures().collect()
    }

    /// Suggestion lines as rendered.
    #[must_use]
    pub fn suggestions(&self) -> Vec<String> {
        self.judgments.suggestions()
    }
}

/// Judge and render one report.
#[must_use]
pub fn generate_report(
    stats: &FrameStatistics,
    baselines: &PerformanceBaselines,
    device: Option<&DeviceSnapshot>,
) -> Report {
    let judgments = Judgments::evaluate(stats, baselines, device);
    let markdown = render::render_markdown(
        &judgments,
        &stats.frame_rate,
        stats.frame_count,
        stats.frame_rasterizer_count,
    );
    Report {
        markdown,
        judgments,
    }
}

#![forbid(unsafe_code)]

//! Frame Perf Report (fpr) turns a captured UI timeline and device
//! telemetry into a markdown performance report.
//!
//! Two stages:
//! 1. **Trace summarizer**: reduces build/raster frame spans and vsync
//!    callbacks to percentile, average, worst-case and refresh-rate statistics
//! 2. **Report generator**: judges those statistics against baselines and
//!    renders a deterministic markdown report with suggestions
//!
//! # Library usage
//!
//! ```rust,no_run
//! use frame_perf_report::prelude::*;
//!
//! # fn main() -> frame_perf_report::core::errors::Result<()> {
//! let raw = std::fs::read_to_string("timeline.json").expect("timeline");
//! let timeline = Timeline::from_json(&raw)?;
//! let stats = TraceSummarizer::new(TraceConfig::default()).summarize(&timeline)?;
//! let report = generate_report(&stats, &PerformanceBaselines::default(), None);
//! save_report(&report.markdown, "run.md", std::path::Path::new("performance_report"))?;
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod report;
pub mod trace;

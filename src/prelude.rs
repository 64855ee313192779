//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use frame_perf_report::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, TraceConfig};
pub use crate::core::errors::{PerfError, Result};

// Trace
pub use crate::trace::summary::TraceSummarizer;
pub use crate::trace::timeline::Timeline;

// Report
pub use crate::report::baselines::PerformanceBaselines;
pub use crate::report::judge::{Check, Judgments};
pub use crate::report::model::{
    DeviceSnapshot, FrameRateBucket, FrameRateHistogram, FrameStatistics, ReportInput,
    TelemetryReading,
};
pub use crate::report::store::{report_directory, report_filename, save_report};
pub use crate::report::{Report, generate_report};

// Logging
pub use crate::logger::jsonl::{JsonlConfig, JsonlWriter, LogEntry};

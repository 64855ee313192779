//! Trace summarizer: timeline parsing and reduction to frame statistics.

pub mod refresh_rate;
pub mod summary;
pub mod timeline;

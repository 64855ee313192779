//! FPR-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, PerfError>;

/// Top-level error type for the frame performance reporter.
#[derive(Debug, Error)]
pub enum PerfError {
    #[error("[FPR-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FPR-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FPR-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FPR-2001] timeline parse failure: {details}")]
    TraceParse { details: String },

    #[error("[FPR-2002] timeline has no {event} events to summarize")]
    EmptyTrace { event: &'static str },

    #[error("[FPR-2003] malformed report input: {details}")]
    ReportInput { details: String },

    #[error("[FPR-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[FPR-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[FPR-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl PerfError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FPR-1001",
            Self::MissingConfig { .. } => "FPR-1002",
            Self::ConfigParse { .. } => "FPR-1003",
            Self::TraceParse { .. } => "FPR-2001",
            Self::EmptyTrace { .. } => "FPR-2002",
            Self::ReportInput { .. } => "FPR-2003",
            Self::Serialization { .. } => "FPR-2101",
            Self::Io { .. } => "FPR-3002",
            Self::Runtime { .. } => "FPR-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for PerfError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for PerfError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

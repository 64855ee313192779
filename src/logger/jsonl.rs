//! JSONL activity log: one self-contained JSON object per line for every
//! summarize/report run.
//!
//! Lines are assembled in memory and written with a single `write_all` so a
//! tailing reader never sees a partial record. Logging never fails a run: a
//! writer that cannot reach its primary file moves to the fallback file, then
//! to stderr with an `[FPR-JSONL]` prefix, then discards.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::errors::{PerfError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TraceSummarized,
    ReportGenerated,
    ReportSaved,
    Error,
}

/// One activity record. Only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Report or timeline path involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,
    /// Checks that did not pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_checks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    /// SHA-256 of the rendered markdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_sha256: Option<String>,
    /// Hash of the effective configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogEntry {
    /// Create an entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            path: None,
            operating_system: None,
            frame_count: None,
            failed_checks: None,
            passed: None,
            report_sha256: None,
            config_hash: None,
            error_code: None,
            error_message: None,
        }
    }

    /// Error record carrying the error's stable code.
    pub fn from_error(err: &PerfError) -> Self {
        Self {
            error_code: Some(err.code().to_string()),
            error_message: Some(err.to_string()),
            ..Self::new(EventType::Error, Severity::Error)
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.display().to_string());
        self
    }
}

/// Hex SHA-256 of a rendered report.
#[must_use]
pub fn report_digest(markdown: &str) -> String {
    use std::fmt::Write as _;
    Sha256::digest(markdown.as_bytes())
        .iter()
        .fold(String::with_capacity(64), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
}

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Rotate once the current file would grow past this size.
    pub max_size_bytes: u64,
    /// Rotated generations kept (`activity.jsonl.1` .. `.N`).
    pub max_rotated_files: u32,
}

impl JsonlConfig {
    /// Defaults around `path`, with a fallback in the temp directory.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            fallback_path: Some(std::env::temp_dir().join("fpr-activity.jsonl")),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Primary,
    Fallback,
    Stderr,
    Discard,
}

/// Append-only JSONL writer with size rotation and a degradation chain.
pub struct JsonlWriter {
    config: JsonlConfig,
    file: Option<File>,
    sink: Sink,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the primary file, degrading as needed. Never fails.
    pub fn open(config: JsonlConfig) -> Self {
        let mut writer = Self {
            config,
            file: None,
            sink: Sink::Discard,
            bytes_written: 0,
        };
        writer.attach(Sink::Primary);
        writer
    }

    /// Append one entry as a single line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(json) => self.write_line(&format!("{json}\n")),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[FPR-JSONL] serialize error: {e}");
            }
        }
    }

    /// Current sink: `primary`, `fallback`, `stderr` or `discard`.
    pub fn state(&self) -> &'static str {
        match self.sink {
            Sink::Primary => "primary",
            Sink::Fallback => "fallback",
            Sink::Stderr => "stderr",
            Sink::Discard => "discard",
        }
    }

    fn current_path(&self) -> Option<&Path> {
        match self.sink {
            Sink::Primary => Some(&self.config.path),
            Sink::Fallback => self.config.fallback_path.as_deref(),
            Sink::Stderr | Sink::Discard => None,
        }
    }

    fn write_line(&mut self, line: &str) {
        let len = line.len() as u64;
        if self.file.is_some() && self.bytes_written + len > self.config.max_size_bytes {
            self.rotate();
        }

        match self.sink {
            Sink::Primary | Sink::Fallback => {
                let ok = self
                    .file
                    .as_mut()
                    .is_some_and(|f| f.write_all(line.as_bytes()).is_ok());
                if ok {
                    self.bytes_written += len;
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            Sink::Stderr => {
                if write!(io::stderr(), "[FPR-JSONL] {line}").is_err() {
                    self.sink = Sink::Discard;
                }
            }
            Sink::Discard => {}
        }
    }

    /// Try `start` and every later sink until one accepts us.
    fn attach(&mut self, start: Sink) {
        self.file = None;
        let mut sink = start;
        loop {
            let path = match sink {
                Sink::Primary => Some(self.config.path.clone()),
                Sink::Fallback => self.config.fallback_path.clone(),
                Sink::Stderr | Sink::Discard => {
                    self.sink = sink;
                    return;
                }
            };
            if let Some(path) = path {
                if let Ok((file, size)) = open_append(&path) {
                    if sink == Sink::Fallback {
                        let _ = writeln!(
                            io::stderr(),
                            "[FPR-JSONL] primary log unavailable, using fallback: {}",
                            path.display()
                        );
                    }
                    self.file = Some(file);
                    self.bytes_written = size;
                    self.sink = sink;
                    return;
                }
            }
            sink = next_sink(sink);
        }
    }

    fn degrade(&mut self) {
        self.attach(next_sink(self.sink));
    }

    fn rotate(&mut self) {
        let Some(base) = self.current_path().map(Path::to_path_buf) else {
            return;
        };
        self.file = None;

        let keep = self.config.max_rotated_files;
        let _ = fs::remove_file(rotated_name(&base, keep));
        for i in (1..keep).rev() {
            let _ = fs::rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        if keep > 0 {
            let _ = fs::rename(&base, rotated_name(&base, 1));
        } else {
            let _ = fs::remove_file(&base);
        }

        match open_append(&base) {
            Ok((file, _)) => {
                self.file = Some(file);
                self.bytes_written = 0;
            }
            Err(_) => self.degrade(),
        }
    }
}

const fn next_sink(sink: Sink) -> Sink {
    match sink {
        Sink::Primary => Sink::Fallback,
        Sink::Fallback => Sink::Stderr,
        Sink::Stderr | Sink::Discard => Sink::Discard,
    }
}

fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| PerfError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| PerfError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// `activity.jsonl` -> `activity.jsonl.2`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

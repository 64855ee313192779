//! Sandboxed runs of the `fpr` binary.
//!
//! Every [`Sandbox`] owns a throwaway `$HOME` that doubles as the working
//! directory, so the default config path, the activity log and the default
//! `performance_report/` root all resolve inside it. `FPR_*` variables from
//! the calling environment are stripped to keep runs reproducible.

#![allow(dead_code)]

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use serde_json::Value;
use tempfile::TempDir;

pub struct Sandbox {
    home: TempDir,
}

/// Outcome of one binary invocation. `Display` renders the full transcript
/// for assertion messages.
pub struct CliRun {
    pub args: Vec<String>,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliRun {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

impl fmt::Display for CliRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fpr {}", self.args.join(" "))?;
        writeln!(f, "status={}", self.status)?;
        writeln!(f, "----- stdout -----\n{}", self.stdout)?;
        write!(f, "----- stderr -----\n{}", self.stderr)
    }
}

fn binary() -> PathBuf {
    match option_env!("CARGO_BIN_EXE_fpr") {
        Some(path) => PathBuf::from(path),
        None => panic!("fpr binary not built; enable the `cli` feature"),
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            home: tempfile::tempdir().expect("create sandbox home"),
        }
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.home.path().join(relative)
    }

    /// Write a fixture file, creating parents.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture parent");
        }
        fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn run(&self, args: &[&str]) -> CliRun {
        let mut command = Command::new(binary());
        command
            .args(args)
            .current_dir(self.home())
            .env("HOME", self.home())
            .env("FPR_OUTPUT_FORMAT", "human")
            .env("RUST_BACKTRACE", "1");
        for (key, _) in std::env::vars_os() {
            if key.to_string_lossy().starts_with("FPR_") && key != "FPR_OUTPUT_FORMAT" {
                command.env_remove(key);
            }
        }
        let output = command.output().expect("execute fpr");
        CliRun {
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// `event` field of every activity-log line, in order.
    pub fn activity_events(&self) -> Vec<String> {
        let Ok(raw) = fs::read_to_string(self.path(".local/share/fpr/activity.jsonl")) else {
            return Vec::new();
        };
        raw.lines()
            .map(|line| {
                let entry: Value = serde_json::from_str(line).expect("activity line is json");
                entry["event"].as_str().unwrap_or_default().to_string()
            })
            .collect()
    }
}

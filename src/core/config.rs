//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{PerfError, Result};
use crate::report::baselines::PerformanceBaselines;

/// Full configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub baselines: PerformanceBaselines,
    pub trace: TraceConfig,
    pub output: OutputConfig,
    pub paths: PathsConfig,
}

/// Timeline reduction knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TraceConfig {
    /// UI frames longer than this count as missed.
    pub build_budget_ms: f64,
    /// Raster frames longer than this count as missed.
    pub raster_budget_ms: f64,
    /// How far a measured refresh rate may sit from a nominal rate and still
    /// be counted towards it.
    pub refresh_rate_margin_hz: f64,
}

/// Where reports land.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub report_root: PathBuf,
    /// Nest reports under a per-OS directory.
    pub group_by_os: bool,
}

/// Filesystem paths used by fpr.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub activity_log: PathBuf,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            build_budget_ms: 16.0,
            raster_budget_ms: 16.0,
            refresh_rate_margin_hz: 6.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_root: PathBuf::from("performance_report"),
            group_by_os: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[FPR-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("fpr").join("config.toml"),
            activity_log: home_dir
                .join(".local")
                .join("share")
                .join("fpr")
                .join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| PerfError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(PerfError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Apply `FPR_*` overrides read through `lookup`.
    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let b = &mut self.baselines;
        set_f64(&mut lookup, "FPR_BASELINE_P90_BUILD_MS", &mut b.p90_build_ms)?;
        set_f64(&mut lookup, "FPR_BASELINE_P95_BUILD_MS", &mut b.p95_build_ms)?;
        set_f64(&mut lookup, "FPR_BASELINE_P99_BUILD_MS", &mut b.p99_build_ms)?;
        set_u64(
            &mut lookup,
            "FPR_BASELINE_MISSED_BUILD_BUDGET_COUNT_MAX",
            &mut b.missed_build_budget_count_max,
        )?;
        set_f64(
            &mut lookup,
            "FPR_BASELINE_MISSED_BUILD_BUDGET_PERCENT_MAX",
            &mut b.missed_build_budget_percent_max,
        )?;
        set_u64(
            &mut lookup,
            "FPR_BASELINE_MISSED_RASTER_BUDGET_COUNT_MAX",
            &mut b.missed_raster_budget_count_max,
        )?;
        set_f64(
            &mut lookup,
            "FPR_BASELINE_MISSED_RASTER_BUDGET_PERCENT_MAX",
            &mut b.missed_raster_budget_percent_max,
        )?;
        set_f64(&mut lookup, "FPR_BASELINE_AVERAGE_BUILD_MS", &mut b.average_build_ms)?;
        set_f64(&mut lookup, "FPR_BASELINE_WORST_BUILD_MS", &mut b.worst_build_ms)?;
        set_f64(
            &mut lookup,
            "FPR_BASELINE_MEMORY_USAGE_MB_MAX",
            &mut b.memory_usage_mb_max,
        )?;
        set_u64(
            &mut lookup,
            "FPR_BASELINE_CPU_USAGE_INCREASE_MAX",
            &mut b.cpu_usage_increase_max,
        )?;

        set_f64(
            &mut lookup,
            "FPR_TRACE_BUILD_BUDGET_MS",
            &mut self.trace.build_budget_ms,
        )?;
        set_f64(
            &mut lookup,
            "FPR_TRACE_RASTER_BUDGET_MS",
            &mut self.trace.raster_budget_ms,
        )?;
        set_f64(
            &mut lookup,
            "FPR_TRACE_REFRESH_RATE_MARGIN_HZ",
            &mut self.trace.refresh_rate_margin_hz,
        )?;

        if let Some(raw) = lookup("FPR_OUTPUT_REPORT_ROOT") {
            self.output.report_root = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("FPR_OUTPUT_GROUP_BY_OS") {
            self.output.group_by_os = parse_bool("FPR_OUTPUT_GROUP_BY_OS", &raw)?;
        }
        if let Some(raw) = lookup("FPR_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Baselines are only checked for sign and finiteness; trace knobs must be positive.
    pub fn validate(&self) -> Result<()> {
        self.baselines.validate()?;

        for (name, value) in [
            ("trace.build_budget_ms", self.trace.build_budget_ms),
            ("trace.raster_budget_ms", self.trace.raster_budget_ms),
            (
                "trace.refresh_rate_margin_hz",
                self.trace.refresh_rate_margin_hz,
            ),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PerfError::InvalidConfig {
                    details: format!("{name} must be > 0.0, got {value}"),
                });
            }
        }

        if self.output.report_root.as_os_str().is_empty() {
            return Err(PerfError::InvalidConfig {
                details: "output.report_root must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_f64<F>(lookup: &mut F, name: &str, slot: &mut f64) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.trim().parse::<f64>().map_err(|error| PerfError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_u64<F>(lookup: &mut F, name: &str, slot: &mut u64) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.trim().parse::<u64>().map_err(|error| PerfError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PerfError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: expected a boolean"),
        }),
    }
}

//! Top-level CLI definition and dispatch.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use frame_perf_report::core::config::Config;
use frame_perf_report::core::errors::PerfError;
use frame_perf_report::logger::jsonl::{
    EventType, JsonlConfig, JsonlWriter, LogEntry, Severity, report_digest,
};
use frame_perf_report::report::generate_report;
use frame_perf_report::report::judge::{Check, Judgments};
use frame_perf_report::report::model::{DeviceSection, DeviceSnapshot, ReportInput};
use frame_perf_report::report::render::{baseline_text, measured_text, status_glyph};
use frame_perf_report::report::store::{
    UNKNOWN_OS_DIR, report_directory, report_filename, save_report,
};
use frame_perf_report::trace::summary::TraceSummarizer;
use frame_perf_report::trace::timeline::Timeline;

/// Frame Perf Report: frame-timing reports for captured UI traces.
#[derive(Debug, Parser)]
#[command(
    name = "fpr",
    author,
    version,
    about = "Frame Perf Report - frame timing statistics and markdown reports",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Reduce a timeline to frame statistics.
    Summarize(SummarizeArgs),
    /// Generate and save a markdown report.
    Report(ReportArgs),
    /// Judge statistics against baselines; exits non-zero on failure.
    Check(CheckArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct SummarizeArgs {
    /// Timeline JSON (trace-event format).
    #[arg(value_name = "TIMELINE")]
    timeline: PathBuf,
    /// Device telemetry JSON (`device_details`, `cpu_usage`, `memory_usage`).
    #[arg(long, value_name = "PATH")]
    device: Option<PathBuf>,
    /// Write the statistics document here instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ReportArgs {
    /// Statistics document produced by `fpr summarize` or the trace collector.
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Output directory (defaults to `<report_root>/<os>/`).
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,
    /// Report filename (defaults to the current UTC timestamp + `.md`).
    #[arg(long, value_name = "NAME")]
    filename: Option<String>,
    /// Also print the markdown to stdout.
    #[arg(long)]
    print: bool,
}

#[derive(Debug, Clone, Args)]
struct CheckArgs {
    /// Statistics document produced by `fpr summarize` or the trace collector.
    #[arg(value_name = "INPUT")]
    input: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
    /// Validate the effective configuration.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// One or more performance checks failed.
    #[error("{0} performance check(s) failed")]
    ChecksFailed(usize),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) | Self::ChecksFailed(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<PerfError> for CliError {
    fn from(err: PerfError) -> Self {
        match err {
            PerfError::InvalidConfig { .. }
            | PerfError::MissingConfig { .. }
            | PerfError::ConfigParse { .. }
            | PerfError::TraceParse { .. }
            | PerfError::EmptyTrace { .. }
            | PerfError::ReportInput { .. } => Self::User(err.to_string()),
            PerfError::Io { .. } | PerfError::Runtime { .. } => Self::Runtime(err.to_string()),
            PerfError::Serialization { .. } => Self::Internal(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Summarize(args) => run_summarize(cli, args),
        Command::Report(args) => run_report(cli, args),
        Command::Check(args) => run_check(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn run_summarize(cli: &Cli, args: &SummarizeArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let mut log = activity_log(&config);

    let summarized = read_text(&args.timeline)
        .and_then(|raw| Timeline::from_json(&raw))
        .and_then(|timeline| TraceSummarizer::new(config.trace.clone()).summarize(&timeline));
    let stats = logged(&mut log, summarized)?;

    let device = match &args.device {
        Some(path) => logged(&mut log, read_device(path))?,
        None => None,
    };

    let mut entry =
        LogEntry::new(EventType::TraceSummarized, Severity::Info).with_path(&args.timeline);
    entry.frame_count = Some(stats.frame_count);
    entry.operating_system = device.as_ref().map(|d| d.operating_system.clone());
    log.write_entry(&entry);

    let document = serde_json::to_string_pretty(&ReportInput::new(&stats, device.as_ref()))?;
    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, format!("{document}\n"))?;
            match output_mode(cli) {
                OutputMode::Human => println!("Statistics written to {}", path.display()),
                OutputMode::Json => write_json_line(&json!({
                    "command": "summarize",
                    "path": path.to_string_lossy(),
                    "frame_count": stats.frame_count,
                }))?,
            }
        }
        None => println!("{document}"),
    }
    Ok(())
}

fn run_report(cli: &Cli, args: &ReportArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let mut log = activity_log(&config);
    let config_hash = config.stable_hash().ok();

    let input = logged(&mut log, read_input(&args.input))?;
    let (stats, device) = input.into_parts();
    let report = generate_report(&stats, &config.baselines, device.as_ref());
    let digest = report_digest(&report.markdown);
    let failed = report.failures().len();

    let mut generated = LogEntry::new(EventType::ReportGenerated, Severity::Info);
    generated.frame_count = Some(stats.frame_count);
    generated.failed_checks = Some(failed);
    generated.passed = Some(report.passed());
    generated.report_sha256 = Some(digest.clone());
    generated.config_hash = config_hash;
    generated.operating_system = device.as_ref().map(|d| d.operating_system.clone());
    log.write_entry(&generated);

    // Emitted before the write so the document survives a failed save.
    let mode = output_mode(cli);
    if args.print && mode == OutputMode::Human {
        println!("{}", report.markdown);
    }

    let directory = match &args.dir {
        Some(dir) => dir.clone(),
        None => logged(&mut log, default_report_dir(&config, device.as_ref()))?,
    };
    let filename = args
        .filename
        .clone()
        .unwrap_or_else(|| report_filename(chrono::Utc::now()));
    let path = match save_report(&report.markdown, &filename, &directory) {
        Ok(path) => path,
        Err(err) => {
            log.write_entry(&LogEntry::from_error(&err));
            if args.print && mode == OutputMode::Json {
                write_json_line(&json!({
                    "command": "report",
                    "path": Value::Null,
                    "passed": report.passed(),
                    "error": err.to_string(),
                    "markdown": report.markdown,
                }))?;
            }
            return Err(err.into());
        }
    };

    let mut saved = LogEntry::new(
        EventType::ReportSaved,
        if report.passed() {
            Severity::Info
        } else {
            Severity::Warning
        },
    )
    .with_path(&path);
    saved.report_sha256 = Some(digest.clone());
    saved.passed = Some(report.passed());
    log.write_entry(&saved);

    match mode {
        OutputMode::Human => {
            let verdict = if report.passed() {
                "all checks passed".green().to_string()
            } else {
                format!("{failed} check(s) failed").red().to_string()
            };
            println!("Report written to {} ({verdict})", path.display());
        }
        OutputMode::Json => {
            let failures: Vec<Value> = report
                .failures()
                .iter()
                .map(|check| serde_json::to_value(check.metric))
                .collect::<Result<_, _>>()?;
            let mut payload = json!({
                "command": "report",
                "path": path.to_string_lossy(),
                "passed": report.passed(),
                "failed_checks": failures,
                "report_sha256": digest,
            });
            if args.print {
                payload["markdown"] = Value::String(report.markdown.clone());
            }
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_check(cli: &Cli, args: &CheckArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let input = read_input(&args.input)?;
    let (stats, device) = input.into_parts();
    let judgments = Judgments::evaluate(&stats, &config.baselines, device.as_ref());
    let failed = judgments.failures().count();

    match output_mode(cli) {
        OutputMode::Human => {
            for line in check_lines(&judgments) {
                println!("{line}");
            }
            println!();
            for suggestion in judgments.suggestions() {
                println!("  - {suggestion}");
            }
        }
        OutputMode::Json => write_json_line(&json!({
            "command": "check",
            "passed": failed == 0,
            "judgments": judgments,
            "suggestions": judgments.suggestions(),
        }))?,
    }

    if failed > 0 {
        return Err(CliError::ChecksFailed(failed));
    }
    Ok(())
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    let command = args.command.unwrap_or(ConfigCommand::Show);
    if matches!(command, ConfigCommand::Path) {
        let path = cli.config.clone().unwrap_or_else(Config::default_path);
        match output_mode(cli) {
            OutputMode::Human => println!("{}", path.display()),
            OutputMode::Json => write_json_line(&json!({
                "command": "config path",
                "path": path.to_string_lossy(),
                "exists": path.exists(),
            }))?,
        }
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    match (command, output_mode(cli)) {
        (ConfigCommand::Validate, OutputMode::Human) => {
            println!("{} configuration is valid", "ok:".green());
        }
        (ConfigCommand::Validate, OutputMode::Json) => write_json_line(&json!({
            "command": "config validate",
            "valid": true,
            "hash": config.stable_hash()?,
        }))?,
        (_, OutputMode::Human) => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| CliError::Internal(format!("render config: {e}")))?;
            print!("{rendered}");
        }
        (_, OutputMode::Json) => write_json_line(&json!({
            "command": "config show",
            "config": config,
        }))?,
    }
    Ok(())
}

// ──────────────────── helpers ────────────────────

fn activity_log(config: &Config) -> JsonlWriter {
    JsonlWriter::open(JsonlConfig::new(config.paths.activity_log.clone()))
}

/// Record failures in the activity log on their way out.
fn logged<T>(log: &mut JsonlWriter, result: Result<T, PerfError>) -> Result<T, CliError> {
    result.map_err(|err| {
        log.write_entry(&LogEntry::from_error(&err));
        CliError::from(err)
    })
}

fn read_text(path: &Path) -> Result<String, PerfError> {
    fs::read_to_string(path).map_err(|source| PerfError::io(path, source))
}

fn read_input(path: &Path) -> Result<ReportInput, PerfError> {
    ReportInput::from_json(&read_text(path)?)
}

fn read_device(path: &Path) -> Result<Option<DeviceSnapshot>, PerfError> {
    let section: DeviceSection =
        serde_json::from_str(&read_text(path)?).map_err(|error| PerfError::ReportInput {
            details: format!("{}: {error}", path.display()),
        })?;
    Ok(section.to_snapshot())
}

fn default_report_dir(
    config: &Config,
    device: Option<&DeviceSnapshot>,
) -> Result<PathBuf, PerfError> {
    let root = &config.output.report_root;
    if !config.output.group_by_os {
        return Ok(root.clone());
    }
    let os = device.map_or(UNKNOWN_OS_DIR, |d| d.operating_system.as_str());
    report_directory(root, os)
}

fn check_lines(judgments: &Judgments) -> Vec<String> {
    let mut lines = Vec::new();
    let mut push = |thread: &str, check: &Check| {
        let status = if check.passed {
            "PASS".green()
        } else {
            "FAIL".red().bold()
        };
        lines.push(format!(
            "{} {status} {thread:<7} {:<28} {:>14}  ({})",
            status_glyph(check.passed),
            check.metric.label(),
            measured_text(&check.actual),
            baseline_text(&check.threshold),
        ));
    };
    for check in judgments.build.rows() {
        push("UI", check);
    }
    for check in judgments.raster.rows() {
        push("Raster", check);
    }
    if let Some(device) = &judgments.device {
        for check in device.rows() {
            push("Device", check);
        }
    }
    lines
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("FPR_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

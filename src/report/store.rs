//! Persisting rendered reports.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;

use crate::core::errors::{PerfError, Result};

/// Directory component used when the OS label is empty after sanitising.
pub const UNKNOWN_OS_DIR: &str = "unknown";

/// Write `text` to `directory/filename`, creating the directory tree first.
///
/// The document goes to a hidden temporary sibling and is renamed into place,
/// so a failed write never leaves a truncated report behind.
pub fn save_report(text: &str, filename: &str, directory: &Path) -> Result<PathBuf> {
    if filename.is_empty() || Path::new(filename).file_name() != Some(filename.as_ref()) {
        return Err(PerfError::Runtime {
            details: format!("report filename {filename:?} must be a single path component"),
        });
    }

    fs::create_dir_all(directory).map_err(|source| PerfError::io(directory, source))?;

    let target = directory.join(filename);
    let tmp = directory.join(format!(".{filename}.tmp"));
    fs::write(&tmp, text).map_err(|source| PerfError::io(&tmp, source))?;
    if let Err(source) = fs::rename(&tmp, &target) {
        let _ = fs::remove_file(&tmp);
        return Err(PerfError::io(&target, source));
    }
    Ok(target)
}

/// `<ISO-8601 timestamp>.md`, with `:` swapped for `-` so the name is valid
/// on every filesystem.
#[must_use]
pub fn report_filename(at: DateTime<Utc>) -> String {
    let stamp = at.to_rfc3339_opts(SecondsFormat::Millis, true);
    format!("{}.md", stamp.replace(':', "-"))
}

/// `<root>/<os>/`, the OS label reduced to one safe path component.
pub fn report_directory(root: &Path, operating_system: &str) -> Result<PathBuf> {
    Ok(root.join(sanitize_component(operating_system)?))
}

fn unsafe_chars() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+"))
        .as_ref()
        .map_err(|err| PerfError::Runtime {
            details: format!("component pattern: {err}"),
        })
}

fn sanitize_component(label: &str) -> Result<String> {
    let cleaned = unsafe_chars()?.replace_all(label.trim(), "_");
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        return Ok(UNKNOWN_OS_DIR.to_string());
    }
    Ok(cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn save_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target_dir = dir.path().join("performance_report").join("android");
        let path = save_report("# Performance Report\n", "run.md", &target_dir).unwrap();
        assert_eq!(path, target_dir.join("run.md"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Performance Report\n");
        assert!(!target_dir.join(".run.md.tmp").exists());
    }

    #[test]
    fn save_overwrites_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        save_report("first version, longer text", "r.md", dir.path()).unwrap();
        let path = save_report("second", "r.md", dir.path()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "second");
    }

    #[test]
    fn save_fails_when_directory_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();
        let err = save_report("x", "r.md", &blocker.join("sub")).unwrap_err();
        assert_eq!(err.code(), "FPR-3002");
    }

    #[test]
    fn save_fails_when_target_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("r.md")).unwrap();
        let err = save_report("x", "r.md", dir.path()).unwrap_err();
        assert_eq!(err.code(), "FPR-3002");
        assert!(matches!(err, PerfError::Io { ref path, .. } if path == &dir.path().join("r.md")));
        assert!(!dir.path().join(".r.md.tmp").exists());
        assert!(dir.path().join("r.md").is_dir());
    }

    #[test]
    fn save_rejects_nested_filename() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_report("x", "../escape.md", dir.path()).unwrap_err();
        assert_eq!(err.code(), "FPR-3900");
        assert!(save_report("x", "", dir.path()).is_err());
    }

    #[test]
    fn filename_is_timestamp_without_colons() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 5, 7).unwrap();
        assert_eq!(report_filename(at), "2026-10-18T09-05-07.000Z.md");
    }

    #[test]
    fn directory_sanitises_os_label() {
        let root = Path::new("performance_report");
        assert_eq!(
            report_directory(root, "android").unwrap(),
            root.join("android")
        );
        assert_eq!(
            report_directory(root, "Unknown OS").unwrap(),
            root.join("Unknown_OS")
        );
        assert_eq!(
            report_directory(root, "../..").unwrap(),
            root.join(UNKNOWN_OS_DIR)
        );
        assert_eq!(report_directory(root, "  ").unwrap(), root.join(UNKNOWN_OS_DIR));
        // Pattern is compiled once and reused.
        assert!(std::ptr::eq(unsafe_chars().unwrap(), unsafe_chars().unwrap()));
    }
}

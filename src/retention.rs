//! C13: Retention — per-data-class archival/deletion over time, with a
//! `compliance_hold` exemption and dry-run reporting (spec §4.13; see
//! `SPEC_FULL.md` §4.13a for the six-class enum and gzip archival
//! decisions).

use crate::error::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The six data classes named in spec §4.13 (the original's `user_data`
/// class is dropped -- this crate has no user-account concept).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataClass {
    Alerts,
    Audit,
    Metrics,
    Reports,
    Temporary,
    Compliance,
}

impl DataClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataClass::Alerts => "alerts",
            DataClass::Audit => "audit",
            DataClass::Metrics => "metrics",
            DataClass::Reports => "reports",
            DataClass::Temporary => "temporary",
            DataClass::Compliance => "compliance",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub class: DataClass,
    pub retention_days: i64,
    pub compliance_hold: bool,
}

/// Files above this size are gzip-archived rather than copied verbatim
/// (spec §4.13: "optionally gzip compressed >=1 MiB").
const GZIP_THRESHOLD_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct RetentionReport {
    pub archived: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub held: Vec<PathBuf>,
}

/// Sweeps `source_dir` for one data class: files older than
/// `policy.retention_days` are moved to `archive_dir` (gzip-compressed
/// above the size threshold) then deleted from `source_dir`, unless
/// `policy.compliance_hold` exempts the class entirely. `dry_run` reports
/// counts without touching the filesystem.
pub fn sweep(
    source_dir: &Path,
    archive_dir: &Path,
    policy: &RetentionPolicy,
    now: chrono::DateTime<chrono::Utc>,
    dry_run: bool,
) -> Result<RetentionReport> {
    let mut report = RetentionReport::default();
    if !source_dir.exists() {
        return Ok(report);
    }

    let cutoff = now - chrono::Duration::days(policy.retention_days);

    for entry in walkdir::WalkDir::new(source_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let modified: chrono::DateTime<chrono::Utc> = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(chrono::DateTime::from)
            .unwrap_or(now);

        if modified >= cutoff {
            continue;
        }

        if policy.compliance_hold {
            report.held.push(path.to_path_buf());
            continue;
        }

        if dry_run {
            report.archived.push(path.to_path_buf());
            report.deleted.push(path.to_path_buf());
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let archived_path = archive_one(path, archive_dir, source_dir, size)?;
        report.archived.push(archived_path);
        std::fs::remove_file(path)?;
        report.deleted.push(path.to_path_buf());
    }

    Ok(report)
}

fn archive_one(path: &Path, archive_dir: &Path, source_dir: &Path, size: u64) -> Result<PathBuf> {
    let relative = path.strip_prefix(source_dir).unwrap_or(path);
    if size >= GZIP_THRESHOLD_BYTES {
        let dest = archive_dir.join(relative).with_extension(format!(
            "{}.gz",
            path.extension().and_then(|e| e.to_str()).unwrap_or("bin")
        ));
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let input = std::fs::read(path)?;
        let out_file = std::fs::File::create(&dest)?;
        let mut encoder = GzEncoder::new(out_file, Compression::default());
        encoder.write_all(&input)?;
        encoder.finish()?;
        Ok(dest)
    } else {
        let dest = archive_dir.join(relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(path, &dest)?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn old_file_is_archived_and_deleted() {
        let source = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        let file_path = source.path().join("old.json");
        std::fs::write(&file_path, b"{}").unwrap();

        let old_time = filetime::FileTime::from_unix_time(0, 0);
        filetime::set_file_mtime(&file_path, old_time).unwrap();

        let policy = RetentionPolicy {
            class: DataClass::Reports,
            retention_days: 30,
            compliance_hold: false,
        };
        let report = sweep(source.path(), archive.path(), &policy, chrono::Utc::now(), false).unwrap();
        assert_eq!(report.deleted.len(), 1);
        assert!(!file_path.exists());
        assert!(archive.path().join("old.json").exists());
    }

    #[test]
    fn compliance_hold_exempts_files() {
        let source = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        let file_path = source.path().join("held.json");
        std::fs::write(&file_path, b"{}").unwrap();
        filetime::set_file_mtime(&file_path, filetime::FileTime::from_unix_time(0, 0)).unwrap();

        let policy = RetentionPolicy {
            class: DataClass::Compliance,
            retention_days: 30,
            compliance_hold: true,
        };
        let report = sweep(source.path(), archive.path(), &policy, chrono::Utc::now(), false).unwrap();
        assert_eq!(report.held.len(), 1);
        assert!(file_path.exists());
    }

    #[test]
    fn dry_run_reports_without_mutating() {
        let source = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        let file_path = source.path().join("old.json");
        std::fs::write(&file_path, b"{}").unwrap();
        filetime::set_file_mtime(&file_path, filetime::FileTime::from_unix_time(0, 0)).unwrap();

        let policy = RetentionPolicy {
            class: DataClass::Reports,
            retention_days: 30,
            compliance_hold: false,
        };
        let report = sweep(source.path(), archive.path(), &policy, chrono::Utc::now(), true).unwrap();
        assert_eq!(report.deleted.len(), 1);
        assert!(file_path.exists());
    }

    #[test]
    fn large_file_is_gzip_compressed() {
        let source = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        let file_path = source.path().join("big.log");
        let mut f = std::fs::File::create(&file_path).unwrap();
        f.write_all(&vec![b'x'; 2 * 1024 * 1024]).unwrap();
        filetime::set_file_mtime(&file_path, filetime::FileTime::from_unix_time(0, 0)).unwrap();

        let policy = RetentionPolicy {
            class: DataClass::Metrics,
            retention_days: 1,
            compliance_hold: false,
        };
        let report = sweep(source.path(), archive.path(), &policy, chrono::Utc::now(), false).unwrap();
        assert_eq!(report.archived.len(), 1);
        assert!(report.archived[0].to_string_lossy().ends_with(".gz"));
    }
}

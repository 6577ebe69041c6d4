use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

/// Self-documenting header written at the top of a new recovery log.
const FILE_HEADER: &str = "\
<!-- daily recovery log: append-only
     Journal content that could not be saved is kept here.
     If an entry went missing after an error, copy it back from below.
     Safe to delete once you have checked it. -->

---
";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Category of a recovery entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// The journal write failed and a backup was restored
    Write,
    /// The journal write failed and no backup could be restored
    Restore,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Write => write!(f, "write"),
            RecoveryCategory::Restore => write!(f, "restore"),
        }
    }
}

/// A single entry in the recovery log.
#[derive(Debug, Clone)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    /// The content that was not saved
    pub body: String,
}

/// Return the path to the recovery log file.
pub fn recovery_log_path(dir: &Path) -> PathBuf {
    dir.join(".recovery.log")
}

// ---------------------------------------------------------------------------
// Atomic file write
// ---------------------------------------------------------------------------

/// Write `content` to `path` atomically using a temp file + rename.
///
/// A symlinked `path` is written through to the file it names, and an
/// existing file keeps its permissions.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    if let Ok(meta) = fs::metadata(&target) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

impl RecoveryEntry {
    /// Format this entry as a markdown block for the recovery log.
    fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} | {}: {}\n\n",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.category,
            self.description,
        );

        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }

        if !self.body.is_empty() {
            out.push_str("\n```text\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }

        out.push_str("\n---\n");
        out
    }
}

/// Append a recovery entry to the log in `dir`. Errors are logged, not returned.
pub fn log_recovery(dir: &Path, entry: RecoveryEntry) {
    if let Err(e) = log_recovery_inner(dir, &entry) {
        tracing::warn!(dir = %dir.display(), "could not write to recovery log: {}", e);
    }
}

fn log_recovery_inner(dir: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let path = recovery_log_path(dir);
    let needs_header = fs::metadata(&path).map_or(true, |m| m.len() == 0);

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_entry(body: &str) -> RecoveryEntry {
        RecoveryEntry {
            timestamp: Utc::now(),
            category: RecoveryCategory::Write,
            description: "journal write failed".to_string(),
            fields: vec![
                ("Target".to_string(), "daily.md".to_string()),
                ("Error".to_string(), "disk full".to_string()),
            ],
            body: body.to_string(),
        }
    }

    #[test]
    fn test_entry_formatting() {
        let md = make_entry("# 2024-01-01 Monday \n").to_markdown();
        assert!(md.starts_with("## "));
        assert!(md.contains("write: journal write failed"));
        assert!(md.contains("Target: daily.md"));
        assert!(md.contains("```text\n# 2024-01-01 Monday \n```"));
        assert!(md.ends_with("---\n"));
    }

    #[test]
    fn test_empty_body_has_no_fence() {
        let md = make_entry("").to_markdown();
        assert!(!md.contains("```"));
    }

    #[test]
    fn test_log_creates_header_once() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("backups");

        log_recovery(&dir, make_entry("first"));
        log_recovery(&dir, make_entry("second"));

        let content = std::fs::read_to_string(recovery_log_path(&dir)).unwrap();
        assert!(content.starts_with("<!-- daily recovery log"));
        assert_eq!(content.matches("daily recovery log").count(), 1);
        assert!(content.contains("first"));
        assert!(content.contains("second"));
    }

    #[test]
    fn test_atomic_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("daily.md");

        atomic_write(&path, b"hello world").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello world");

        atomic_write(&path, b"goodbye").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "goodbye");
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("daily.md");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        atomic_write(&path, b"new").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_through_symlink() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("real.md");
        let link = tmp.path().join("daily.md");
        std::fs::write(&real, "old").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        atomic_write(&link, b"new").unwrap();
        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&real).unwrap(), "new");
    }

    #[test]
    fn test_atomic_write_missing_dir_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope").join("daily.md");
        assert!(atomic_write(&path, b"x").is_err());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(RecoveryCategory::Write.to_string(), "write");
        assert_eq!(RecoveryCategory::Restore.to_string(), "restore");
    }
}

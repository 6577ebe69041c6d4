use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::io::journal_io::JournalError;
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry, atomic_write};
use crate::model::journal::JournalIndex;
use crate::parse::split_lines;

/// A backup copy of the journal: `<backups_dir>/<file name>.<unix millis>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    /// Milliseconds since the epoch; strictly increasing per journal
    pub stamp: u128,
}

/// Result of a committed backup-guarded write
#[derive(Debug)]
pub struct Commit<T> {
    pub lines: Vec<String>,
    pub index: JournalIndex,
    pub value: T,
}

/// Takes a backup before every journal write, restores it if the write fails,
/// and keeps only the newest `retention` backups.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    retention: usize,
}

impl BackupManager {
    /// A retention of zero is raised to one so a restore source always survives pruning.
    pub fn new(dir: impl Into<PathBuf>, retention: usize) -> Self {
        BackupManager {
            dir: dir.into(),
            retention: retention.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Copy the journal into the backups directory, creating it if needed.
    pub fn backup(&self, journal: &Path) -> io::Result<Backup> {
        fs::create_dir_all(&self.dir)?;
        let mut stamp = now_millis();
        if let Some(latest) = self.list(journal)?.first() {
            stamp = stamp.max(latest.stamp + 1);
        }
        let path = self
            .dir
            .join(format!("{}{}", backup_prefix(journal), stamp));
        fs::copy(journal, &path)?;
        debug!(backup = %path.display(), "backed up journal");
        Ok(Backup { path, stamp })
    }

    /// Backups of `journal`, newest first. A missing directory has none.
    pub fn list(&self, journal: &Path) -> io::Result<Vec<Backup>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let prefix = backup_prefix(journal);
        let mut backups = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(stamp) = name
                .strip_prefix(&prefix)
                .and_then(|s| s.parse::<u128>().ok())
            {
                backups.push(Backup { path, stamp });
            }
        }
        backups.sort_by(|a, b| b.stamp.cmp(&a.stamp));
        Ok(backups)
    }

    /// Delete all but the newest `retention` backups. Returns how many were removed.
    pub fn prune(&self, journal: &Path) -> io::Result<usize> {
        let stale: Vec<Backup> = self.list(journal)?.into_iter().skip(self.retention).collect();
        for backup in &stale {
            fs::remove_file(&backup.path)?;
        }
        if !stale.is_empty() {
            debug!(removed = stale.len(), "pruned old backups");
        }
        Ok(stale.len())
    }

    /// The backup most recently created on disk (by file creation time, not name).
    pub fn latest_created(&self, journal: &Path) -> io::Result<Option<PathBuf>> {
        let mut newest: Option<(SystemTime, u128, PathBuf)> = None;
        for backup in self.list(journal)? {
            let meta = fs::metadata(&backup.path)?;
            let created = meta.created().or_else(|_| meta.modified())?;
            let is_newer = newest
                .as_ref()
                .is_none_or(|(time, stamp, _)| (created, backup.stamp) > (*time, *stamp));
            if is_newer {
                newest = Some((created, backup.stamp, backup.path));
            }
        }
        Ok(newest.map(|(_, _, path)| path))
    }

    /// Copy the most recently created backup over the journal.
    pub fn restore_latest(&self, journal: &Path) -> io::Result<Option<PathBuf>> {
        let Some(latest) = self.latest_created(journal)? else {
            return Ok(None);
        };
        fs::copy(&latest, journal)?;
        Ok(Some(latest))
    }

    /// Run one guarded write of the journal.
    ///
    /// `mutate` edits a copy of `lines`; returning `None` means "no change"
    /// and nothing is written. Otherwise the journal is backed up, overwritten
    /// with the new lines, and `reindex` runs against them. If the overwrite or
    /// `reindex` fails, the latest backup is restored before the error is
    /// returned, so the file on disk matches what it was before the call.
    pub fn with_backup<T>(
        &self,
        journal: &Path,
        lines: &[String],
        mutate: impl FnOnce(&mut Vec<String>) -> Option<T>,
        reindex: impl FnOnce(&[String]) -> Result<JournalIndex, JournalError>,
    ) -> Result<Option<Commit<T>>, JournalError> {
        let mut next = lines.to_vec();
        let Some(value) = mutate(&mut next) else {
            debug!("no change to write");
            return Ok(None);
        };
        // One element per line of the written file
        let content = next.concat();
        let next = split_lines(&content);

        self.backup(journal)
            .map_err(|source| JournalError::BackupFailed {
                path: self.dir.clone(),
                source,
            })?;

        let written = atomic_write(journal, content.as_bytes())
            .map_err(|e| e.to_string())
            .and_then(|()| reindex(&next).map_err(|e| e.to_string()));
        let index = match written {
            Ok(index) => index,
            Err(reason) => return Err(self.recover(journal, content, reason)),
        };

        if let Err(e) = self.prune(journal) {
            warn!(dir = %self.dir.display(), "could not prune backups: {}", e);
        }

        Ok(Some(Commit {
            lines: next,
            index,
            value,
        }))
    }

    /// Put the last backup back after a failed write and keep the unsaved content.
    fn recover(&self, journal: &Path, unsaved: String, reason: String) -> JournalError {
        let restored_from = match self.restore_latest(journal) {
            Ok(restored) => restored,
            Err(e) => {
                error!(journal = %journal.display(), "could not restore backup: {}", e);
                None
            }
        };
        error!(
            journal = %journal.display(),
            restored = restored_from.is_some(),
            "journal write failed: {}",
            reason
        );

        let category = if restored_from.is_some() {
            RecoveryCategory::Write
        } else {
            RecoveryCategory::Restore
        };
        let mut fields = vec![
            ("Target".to_string(), journal.display().to_string()),
            ("Error".to_string(), reason.clone()),
        ];
        if let Some(path) = &restored_from {
            fields.push(("Restored".to_string(), path.display().to_string()));
        }
        recovery::log_recovery(
            &self.dir,
            RecoveryEntry {
                timestamp: Utc::now(),
                category,
                description: "journal write failed".to_string(),
                fields,
                body: unsaved,
            },
        );

        JournalError::WriteFailed {
            path: journal.to_path_buf(),
            reason,
            restored_from,
        }
    }
}

fn backup_prefix(journal: &Path) -> String {
    let name = journal
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "journal".to_string());
    format!("{}.", name)
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

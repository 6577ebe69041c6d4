use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default number of journal backups retained after each write.
pub const DEFAULT_BACKUPS_TO_KEEP: usize = 10;

/// Configuration from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// The journal file
    pub file_path: PathBuf,
    /// Directory holding timestamped backups (default: `backups/` beside the config)
    #[serde(default, alias = "backup_file_path")]
    pub backups_dir: Option<PathBuf>,
    #[serde(default = "default_backups_to_keep")]
    pub num_backups_to_keep: usize,
    /// Index cache file (default: `indexes.bin` beside the config)
    #[serde(default)]
    pub date_index_filename: Option<PathBuf>,
    /// Persist the index between runs
    #[serde(default = "default_true")]
    pub save_index: bool,
    /// Directory relative paths are resolved against (the config file's directory)
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_backups_to_keep() -> usize {
    DEFAULT_BACKUPS_TO_KEEP
}

impl JournalConfig {
    /// A config for `file_path` with every other option at its default.
    pub fn new(file_path: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        JournalConfig {
            file_path: file_path.into(),
            backups_dir: None,
            num_backups_to_keep: DEFAULT_BACKUPS_TO_KEEP,
            date_index_filename: None,
            save_index: true,
            base_dir: base_dir.into(),
        }
    }

    pub fn journal_path(&self) -> PathBuf {
        self.resolve(&self.file_path)
    }

    pub fn backups_dir(&self) -> PathBuf {
        match &self.backups_dir {
            Some(dir) => self.resolve(dir),
            None => self.base_dir.join("backups"),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        match &self.date_index_filename {
            Some(path) => self.resolve(path),
            None => self.base_dir.join("indexes.bin"),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Effective values, in display order
    pub fn values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("file_path", self.journal_path().display().to_string()),
            ("backups_dir", self.backups_dir().display().to_string()),
            ("num_backups_to_keep", self.num_backups_to_keep.to_string()),
            ("date_index_filename", self.index_path().display().to_string()),
            ("save_index", self.save_index.to_string()),
        ]
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::io::backup::BackupManager;
use crate::io::index_cache::IndexCache;
use crate::model::config::JournalConfig;
use crate::model::journal::{JournalIndex, OpenTask, TaskLine};
use crate::ops::{entry_ops, task_ops};
use crate::parse::{DateMatcher, MalformedJournal, PatternError, build_index, split_lines};

/// Error type for journal operations
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("journal not found: {0}")]
    FileNotFound(PathBuf),
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("not a file: {0}")]
    NotAFile(PathBuf),
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: io::Error,
    },
    #[error(transparent)]
    MalformedJournal(#[from] MalformedJournal),
    #[error("no section for {0}; add its header first")]
    DateHeaderNotFound(String),
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
    #[error("no open task numbered {selection} (there are {available})")]
    InvalidSelection { selection: usize, available: usize },
    #[error("could not back up journal into {path}: {source}")]
    BackupFailed {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not write {path}: {reason} ({})", restore_note(.restored_from))]
    WriteFailed {
        path: PathBuf,
        reason: String,
        restored_from: Option<PathBuf>,
    },
}

fn restore_note(restored_from: &Option<PathBuf>) -> String {
    match restored_from {
        Some(path) => format!("restored from {}", path.display()),
        None => "no backup could be restored; see the recovery log".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Prompting
// ---------------------------------------------------------------------------

/// What the user picked from a numbered list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// 1-based option number
    Task(usize),
    Quit,
    /// Raw input that was neither a number nor a quit
    Invalid(String),
}

/// Source of interactive choices. The console version lives in the CLI.
pub trait Prompt {
    fn present(&mut self, options: &[String]);
    fn read_selection(&mut self) -> Selection;
    fn notify(&mut self, _message: &str) {}
}

pub fn invalid_selection_message(available: usize) -> String {
    format!(
        "Invalid input. Please enter a number between 1 and {} or 'q' to quit.",
        available
    )
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The journal loaded into memory, with its index.
///
/// Every mutation goes through [`BackupManager::with_backup`]: the file is
/// backed up, rewritten, and the index rebuilt from the new lines. The
/// in-memory lines only change once that whole sequence has succeeded.
#[derive(Debug)]
pub struct JournalStore {
    path: PathBuf,
    lines: Vec<String>,
    index: JournalIndex,
    cache: IndexCache,
    backups: BackupManager,
}

impl JournalStore {
    /// Open the journal named by `config` and load it.
    pub fn open(config: &JournalConfig) -> Result<Self, JournalError> {
        JournalStore::open_with(
            config.journal_path(),
            IndexCache::new(config.index_path(), config.save_index),
            BackupManager::new(config.backups_dir(), config.num_backups_to_keep),
        )
    }

    pub fn open_with(
        path: impl Into<PathBuf>,
        cache: IndexCache,
        backups: BackupManager,
    ) -> Result<Self, JournalError> {
        let mut store = JournalStore {
            path: path.into(),
            lines: Vec::new(),
            index: JournalIndex::default(),
            cache,
            backups,
        };
        store.load()?;
        Ok(store)
    }

    /// Re-read the journal from disk, taking the index from the cache when it is fresh.
    pub fn load(&mut self) -> Result<(), JournalError> {
        let content = read_journal(&self.path)?;
        let lines = split_lines(&content);
        let index = self.load_index(&lines)?;
        self.lines = lines;
        self.index = index;
        Ok(())
    }

    fn load_index(&self, lines: &[String]) -> Result<JournalIndex, JournalError> {
        if !self.cache.is_stale(&self.path) {
            match self.cache.load() {
                Ok(index) if index.is_consistent_with(lines) => {
                    debug!(cache = %self.cache.path().display(), "index cache hit");
                    return Ok(index);
                }
                Ok(_) => warn!(
                    cache = %self.cache.path().display(),
                    "index cache does not match the journal; rebuilding"
                ),
                Err(e) => warn!("{}; rebuilding", e),
            }
        }

        let index = build_index(lines)?;
        debug!(
            sections = index.date_ranges.len(),
            open_tasks = index.open_task_positions.len(),
            "built journal index"
        );
        self.save_index(&index);
        Ok(index)
    }

    fn save_index(&self, index: &JournalIndex) {
        if let Err(e) = self.cache.save(index) {
            warn!("{}", e);
        }
    }

    /// Apply one guarded mutation. `None` from `mutate` means nothing changed.
    fn commit<T>(
        &mut self,
        mutate: impl FnOnce(&mut Vec<String>) -> Option<T>,
    ) -> Result<Option<T>, JournalError> {
        let committed = self
            .backups
            .with_backup(&self.path, &self.lines, mutate, |lines| {
                Ok(build_index(lines)?)
            })?;
        let Some(commit) = committed else {
            return Ok(None);
        };
        self.lines = commit.lines;
        self.index = commit.index;
        self.save_index(&self.index);
        Ok(Some(commit.value))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add a header for `date` at the end of the journal unless its section
    /// already exists. Returns whether a header was written.
    pub fn ensure_header_for_date(&mut self, date: NaiveDate) -> Result<bool, JournalError> {
        let key = entry_ops::date_key(date);
        if self.has_section(&key) {
            return Ok(false);
        }
        let header = entry_ops::format_header(date);
        self.commit(|lines| {
            entry_ops::append_header(lines, header);
            Some(())
        })?;
        debug!(date = %key, "added date header");
        Ok(true)
    }

    /// Insert `text` after the last line of the section for `date_key`.
    pub fn append_to_section(&mut self, date_key: &str, text: &str) -> Result<(), JournalError> {
        let section = self
            .index
            .section(date_key)
            .ok_or_else(|| JournalError::DateHeaderNotFound(date_key.to_string()))?;
        self.commit(|lines| {
            entry_ops::insert_after_section(lines, section, text);
            Some(())
        })?;
        Ok(())
    }

    /// Move every open task outside `date_key`'s section into it, leaving a
    /// migrated marker behind. Returns how many tasks moved; zero writes nothing.
    pub fn migrate_open_tasks_to(&mut self, date_key: &str) -> Result<usize, JournalError> {
        let target = self
            .index
            .section(date_key)
            .ok_or_else(|| JournalError::DateHeaderNotFound(date_key.to_string()))?;
        let positions = self.index.open_task_positions.clone();
        let moved = self.commit(|lines| {
            let moved = task_ops::migrate_open_tasks(lines, &positions, target);
            (moved > 0).then_some(moved)
        })?;
        Ok(moved.unwrap_or(0))
    }

    /// Complete open task `number` (1-based, file order).
    pub fn complete_task(&mut self, number: usize) -> Result<OpenTask, JournalError> {
        let task = self
            .open_tasks()
            .into_iter()
            .find(|t| t.number == number)
            .ok_or(JournalError::InvalidSelection {
                selection: number,
                available: self.index.open_task_positions.len(),
            })?;
        let position = task.position;
        self.commit(|lines| task_ops::complete_task(lines, position).then_some(()))?;
        Ok(task)
    }

    /// Offer the open tasks until the user quits or none are left.
    ///
    /// The list is renumbered after each completion, and each completion is
    /// written before the next prompt, so quitting keeps what was done.
    pub fn complete_tasks_interactively(
        &mut self,
        prompt: &mut dyn Prompt,
    ) -> Result<usize, JournalError> {
        let mut completed = 0;
        loop {
            let tasks = self.open_tasks();
            if tasks.is_empty() {
                prompt.notify("No open tasks.");
                break;
            }
            let options: Vec<String> = tasks.iter().map(|t| t.text.clone()).collect();
            prompt.present(&options);

            match prompt.read_selection() {
                Selection::Quit => break,
                Selection::Task(number) => match self.complete_task(number) {
                    Ok(task) => {
                        completed += 1;
                        prompt.notify(&format!("Completed: {}", task.text));
                    }
                    Err(JournalError::InvalidSelection { available, .. }) => {
                        prompt.notify(&invalid_selection_message(available));
                    }
                    Err(e) => return Err(e),
                },
                Selection::Invalid(_) => prompt.notify(&invalid_selection_message(tasks.len())),
            }
        }
        Ok(completed)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Sections whose date matches `pattern`, in index order.
    pub fn sections_matching(
        &self,
        pattern: &str,
    ) -> Result<Vec<(String, Vec<String>)>, JournalError> {
        let matcher = DateMatcher::expand(pattern)?;
        Ok(self
            .index
            .date_ranges
            .keys()
            .filter(|key| matcher.is_match(key))
            .map(|key| (key.clone(), self.section_lines(key).unwrap_or_default()))
            .collect())
    }

    pub fn section_lines(&self, date_key: &str) -> Option<Vec<String>> {
        let section = self.index.section(date_key)?;
        self.lines.get(section.range()).map(<[String]>::to_vec)
    }

    pub fn has_section(&self, date_key: &str) -> bool {
        self.index.date_ranges.contains_key(date_key)
    }

    pub fn open_tasks(&self) -> Vec<OpenTask> {
        task_ops::open_tasks(&self.lines, &self.index.open_task_positions)
    }

    pub fn task_lines(&self) -> Vec<TaskLine> {
        task_ops::task_lines(&self.lines)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn index(&self) -> &JournalIndex {
        &self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }
}

/// Read the whole journal, mapping failures onto the journal error kinds.
fn read_journal(path: &Path) -> Result<String, JournalError> {
    let io_error = |source: io::Error| match source.kind() {
        io::ErrorKind::NotFound => JournalError::FileNotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => JournalError::PermissionDenied(path.to_path_buf()),
        _ => JournalError::Io {
            path: path.to_path_buf(),
            source,
        },
    };
    let meta = fs::metadata(path).map_err(io_error)?;
    if !meta.is_file() {
        return Err(JournalError::NotAFile(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(io_error)
}

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::io::recovery::atomic_write;
use crate::model::journal::JournalIndex;

const CACHE_MAGIC: [u8; 4] = *b"DIDX";
const CACHE_VERSION: u32 = 1;

/// Error type for index cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("index cache unavailable: {0}")]
    Unavailable(String),
    #[error("could not encode index cache: {0}")]
    Encode(#[from] bincode::Error),
    #[error("could not write index cache {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// On-disk envelope for the index
#[derive(Serialize, Deserialize)]
struct CachedIndex {
    magic: [u8; 4],
    version: u32,
    index: JournalIndex,
}

/// True if the cache is missing or older than the journal.
///
/// Unreadable timestamps count as stale.
pub fn is_stale(journal: &Path, cache: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified());
    match (modified(journal), modified(cache)) {
        (Ok(journal_time), Ok(cache_time)) => journal_time > cache_time,
        _ => true,
    }
}

/// Read a cached index. Missing or corrupt files are `Unavailable`.
pub fn load(cache: &Path) -> Result<JournalIndex, CacheError> {
    let bytes = fs::read(cache)
        .map_err(|e| CacheError::Unavailable(format!("{}: {}", cache.display(), e)))?;
    let cached: CachedIndex = bincode::deserialize(&bytes)
        .map_err(|e| CacheError::Unavailable(format!("{} is corrupt: {}", cache.display(), e)))?;
    if cached.magic != CACHE_MAGIC || cached.version != CACHE_VERSION {
        return Err(CacheError::Unavailable(format!(
            "{} has an unknown format",
            cache.display()
        )));
    }
    Ok(cached.index)
}

/// Write the index to `cache`, creating its directory if needed.
pub fn save(cache: &Path, index: &JournalIndex) -> Result<(), CacheError> {
    let bytes = bincode::serialize(&CachedIndex {
        magic: CACHE_MAGIC,
        version: CACHE_VERSION,
        index: index.clone(),
    })?;
    let write_error = |source| CacheError::WriteError {
        path: cache.to_path_buf(),
        source,
    };
    if let Some(dir) = cache.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_error)?;
    }
    atomic_write(cache, &bytes).map_err(write_error)
}

/// The index cache as configured: a path plus the `save_index` switch.
///
/// When disabled, nothing is read or written and every load is a miss.
#[derive(Debug, Clone)]
pub struct IndexCache {
    path: PathBuf,
    enabled: bool,
}

impl IndexCache {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        IndexCache {
            path: path.into(),
            enabled,
        }
    }

    pub fn disabled() -> Self {
        IndexCache::new(PathBuf::new(), false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_stale(&self, journal: &Path) -> bool {
        !self.enabled || is_stale(journal, &self.path)
    }

    pub fn load(&self) -> Result<JournalIndex, CacheError> {
        if !self.enabled {
            return Err(CacheError::Unavailable("index caching is disabled".into()));
        }
        load(&self.path)
    }

    pub fn save(&self, index: &JournalIndex) -> Result<(), CacheError> {
        if !self.enabled {
            return Ok(());
        }
        save(&self.path, index)
    }

    /// Delete the cache file. Returns whether one existed.
    pub fn clear(&self) -> std::io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

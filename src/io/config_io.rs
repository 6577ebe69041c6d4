use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::recovery::atomic_write;
use crate::model::config::{DEFAULT_BACKUPS_TO_KEEP, JournalConfig};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "DAILY_CONFIG";

const CONFIG_TEMPLATE: &str = r##"# daily configuration
# Relative paths are resolved against the directory holding this file.

# The journal (.md or .txt)
file_path = "daily.md"

# Timestamped copies are taken before every write (default: backups/ beside this file)
# backups_dir = "backups"
num_backups_to_keep = 10

# Keep the date index between runs so large journals load quickly
save_index = true
# date_index_filename = "indexes.bin"
"##;

/// Error type for config file operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config at {path}; run `daily init` to create one")]
    NotFound { path: PathBuf },
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("invalid config {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config document: {0}")]
    Document(#[from] toml_edit::TomlError),
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("cannot locate a config file: pass --config, or set ${} or $HOME", CONFIG_ENV)]
    NoLocation,
    #[error("{0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Resolve the config file from the `--config` flag and the environment.
pub fn config_path(flag: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let var = |name: &str| std::env::var_os(name).map(PathBuf::from);
    config_path_from(
        flag,
        var(CONFIG_ENV),
        var("XDG_CONFIG_HOME"),
        var("HOME"),
    )
    .ok_or(ConfigError::NoLocation)
}

/// Precedence: flag, `$DAILY_CONFIG`, `$XDG_CONFIG_HOME/daily`, `$HOME/.config/daily`.
/// Empty variables count as unset.
pub fn config_path_from(
    flag: Option<&Path>,
    daily_config: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    let set = |p: Option<PathBuf>| p.filter(|p| !p.as_os_str().is_empty());
    if let Some(flag) = flag {
        return Some(flag.to_path_buf());
    }
    if let Some(path) = set(daily_config) {
        return Some(path);
    }
    set(xdg_config_home)
        .or_else(|| set(home).map(|h| h.join(".config")))
        .map(|dir| dir.join("daily").join("config.toml"))
}

// ---------------------------------------------------------------------------
// Read / write
// ---------------------------------------------------------------------------

/// Read the config, returning both the parsed config and the raw
/// toml_edit document for round-trip-safe editing.
///
/// Relative paths in the config resolve against the file's directory.
pub fn read_config(path: &Path) -> Result<(JournalConfig, toml_edit::DocumentMut), ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let mut config: JournalConfig =
        toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
    config.base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

pub fn load_config(path: &Path) -> Result<JournalConfig, ConfigError> {
    read_config(path).map(|(config, _)| config)
}

/// Write the config document, creating the directory if needed.
pub fn write_config(path: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::WriteError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_error)?;
    }
    atomic_write(path, doc.to_string().as_bytes()).map_err(write_error)
}

// ---------------------------------------------------------------------------
// Editing
// ---------------------------------------------------------------------------

/// Values collected by `daily init`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSettings {
    pub file_path: PathBuf,
    pub backups_dir: Option<PathBuf>,
    pub num_backups_to_keep: usize,
    pub save_index: bool,
}

impl Default for ConfigSettings {
    fn default() -> Self {
        ConfigSettings {
            file_path: PathBuf::from("daily.md"),
            backups_dir: None,
            num_backups_to_keep: DEFAULT_BACKUPS_TO_KEEP,
            save_index: true,
        }
    }
}

/// A fresh, commented config document carrying `settings`.
pub fn new_config_document(settings: &ConfigSettings) -> toml_edit::DocumentMut {
    let mut doc: toml_edit::DocumentMut = CONFIG_TEMPLATE
        .parse()
        .unwrap_or_else(|_| toml_edit::DocumentMut::new());
    apply_settings(&mut doc, settings);
    doc
}

/// Set the init-managed keys, leaving every other key and comment in place.
pub fn apply_settings(doc: &mut toml_edit::DocumentMut, settings: &ConfigSettings) {
    doc["file_path"] = toml_edit::value(settings.file_path.display().to_string());
    match &settings.backups_dir {
        Some(dir) => {
            doc.remove("backup_file_path");
            doc["backups_dir"] = toml_edit::value(dir.display().to_string());
        }
        None => {
            doc.remove("backups_dir");
        }
    }
    doc["num_backups_to_keep"] = toml_edit::value(settings.num_backups_to_keep as i64);
    doc["save_index"] = toml_edit::value(settings.save_index);
}

/// Journals must be markdown or plain text.
pub fn validate_journal_path(path: &Path) -> Result<(), ConfigError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if ext == "md" || ext == "txt" {
        Ok(())
    } else {
        let shown = if ext.is_empty() {
            "files without an extension are".to_string()
        } else {
            format!(".{} files are", ext)
        };
        Err(ConfigError::Invalid(format!(
            "{} not supported; use a .md or .txt journal",
            shown
        )))
    }
}

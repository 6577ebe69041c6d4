use serde::Serialize;

use crate::io::backup::Backup;
use crate::model::journal::{OpenTask, TaskLine};

/// Rule printed above and below a section
const SEPARATOR: &str = "-----------------------------------------";

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SectionJson {
    pub date: String,
    pub lines: Vec<String>,
}

#[derive(Serialize)]
pub struct BackupJson {
    pub path: String,
    pub stamp: u128,
}

#[derive(Serialize)]
pub struct MutationJson {
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrated: Option<usize>,
}

pub fn section_to_json(date: &str, lines: &[String]) -> SectionJson {
    SectionJson {
        date: date.to_string(),
        lines: lines
            .iter()
            .map(|l| l.trim_end_matches(['\n', '\r']).to_string())
            .collect(),
    }
}

pub fn backup_to_json(backup: &Backup) -> BackupJson {
    BackupJson {
        path: backup.path.display().to_string(),
        stamp: backup.stamp,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Boxed title:
///
/// ```text
/// +-----------------+
/// |    TODO LIST    |
/// +-----------------+
/// ```
pub fn format_banner(title: &str) -> Vec<String> {
    let rule = format!("+{}+", "-".repeat(title.chars().count() + 8));
    vec![rule.clone(), format!("|    {}    |", title), rule]
}

/// A section between two rules, blank lines dropped
pub fn format_section(lines: &[String]) -> Vec<String> {
    let mut out = vec![SEPARATOR.to_string()];
    out.extend(
        lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.trim_end().to_string()),
    );
    out.push(SEPARATOR.to_string());
    out
}

/// Numbered open tasks, as offered for completion
pub fn format_task_list(tasks: &[OpenTask]) -> Vec<String> {
    if tasks.is_empty() {
        return vec!["No open tasks.".to_string()];
    }
    tasks
        .iter()
        .map(|t| format!(" {}) {}", t.number, t.text))
        .collect()
}

/// Every task line with its 1-based line number in the journal
pub fn format_all_tasks(tasks: &[TaskLine]) -> Vec<String> {
    let width = tasks
        .last()
        .map(|t| (t.position + 1).to_string().len())
        .unwrap_or(1);
    tasks
        .iter()
        .map(|t| {
            format!(
                "{:>width$}: {}{}",
                t.position + 1,
                t.marker.prefix(),
                t.text,
                width = width
            )
        })
        .collect()
}

pub fn format_config(values: &[(&str, String)]) -> Vec<String> {
    let mut out = format_banner("CONFIG VALUES");
    out.push(String::new());
    out.extend(values.iter().map(|(name, value)| format!("{}: {}", name, value)));
    out.push(String::new());
    out
}

pub fn format_backups(backups: &[Backup]) -> Vec<String> {
    if backups.is_empty() {
        return vec!["No backups yet.".to_string()];
    }
    backups.iter().map(|b| b.path.display().to_string()).collect()
}

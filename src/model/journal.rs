use std::ops::RangeInclusive;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Prefix that opens a date header line: `# 2025-05-14 Wednesday `
pub const HEADER_MARKER: &str = "# ";

/// Length of a `YYYY-MM-DD` date key
pub const DATE_KEY_LEN: usize = 10;

/// Checklist state of a task line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMarker {
    Open,
    Completed,
    Migrated,
}

impl TaskMarker {
    /// The literal line prefix for this marker, including the trailing space
    pub fn prefix(self) -> &'static str {
        match self {
            TaskMarker::Open => "- [ ] ",
            TaskMarker::Completed => "- [x] ",
            TaskMarker::Migrated => "- [>] ",
        }
    }

    /// Detect the marker a line starts with, if any
    pub fn from_line(line: &str) -> Option<TaskMarker> {
        [TaskMarker::Open, TaskMarker::Completed, TaskMarker::Migrated]
            .into_iter()
            .find(|marker| line.starts_with(marker.prefix()))
    }
}

impl std::fmt::Display for TaskMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskMarker::Open => write!(f, "open"),
            TaskMarker::Completed => write!(f, "completed"),
            TaskMarker::Migrated => write!(f, "migrated"),
        }
    }
}

/// What a single journal line is, as far as the index cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// A date header; carries the `YYYY-MM-DD` key
    Header(&'a str),
    Task(TaskMarker),
    /// Empty or whitespace-only
    Blank,
    /// Anything else (free-form log entries, notes)
    Content,
}

/// Classify a line of the journal.
///
/// A header is `# ` followed by a 10-character `YYYY-MM-DD` date. Other `# `
/// lines (e.g. `# Notes`) are plain content.
pub fn classify(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some(key) = header_date_key(line) {
        return LineKind::Header(key);
    }
    match TaskMarker::from_line(line) {
        Some(marker) => LineKind::Task(marker),
        None => LineKind::Content,
    }
}

/// Extract the date key from a header line, if it is one.
pub fn header_date_key(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(HEADER_MARKER)?;
    let key = rest.get(..DATE_KEY_LEN)?;
    looks_like_date(key).then_some(key)
}

fn looks_like_date(key: &str) -> bool {
    key.bytes().enumerate().all(|(i, b)| match i {
        4 | 7 => b == b'-',
        _ => b.is_ascii_digit(),
    })
}

/// Inclusive line range owned by one date header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Line index of the header
    pub start: usize,
    /// Line index of the last line before the next header (or end of file)
    pub end: usize,
}

impl Section {
    pub fn new(start: usize, end: usize) -> Self {
        Section { start, end }
    }

    pub fn contains(&self, position: usize) -> bool {
        self.start <= position && position <= self.end
    }

    /// Number of lines in the section, header included
    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn range(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Derived index over the journal lines.
///
/// Never edited by hand: every successful write rebuilds it from the lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalIndex {
    /// Date key → section, in order of first appearance in the file
    pub date_ranges: IndexMap<String, Section>,
    /// Line positions of open (`- [ ] `) tasks, ascending
    pub open_task_positions: Vec<usize>,
}

impl JournalIndex {
    pub fn section(&self, date_key: &str) -> Option<Section> {
        self.date_ranges.get(date_key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.date_ranges.is_empty() && self.open_task_positions.is_empty()
    }

    /// Check that this index still describes `lines`: every section starts at
    /// its own header, the sections cover the file, and every recorded task
    /// is open.
    pub fn is_consistent_with(&self, lines: &[String]) -> bool {
        let sections_ok = self.date_ranges.iter().all(|(key, section)| {
            section.start <= section.end
                && section.end < lines.len()
                && lines
                    .iter()
                    .skip(section.start)
                    .find(|l| !l.trim().is_empty())
                    .and_then(|l| header_date_key(l))
                    == Some(key.as_str())
        });
        let tasks_ok = self.open_task_positions.iter().all(|&pos| {
            lines
                .get(pos)
                .is_some_and(|l| l.starts_with(TaskMarker::Open.prefix()))
        });
        let count_ok = self.open_task_positions.len()
            == lines
                .iter()
                .filter(|l| l.starts_with(TaskMarker::Open.prefix()))
                .count();
        sections_ok && tasks_ok && count_ok && self.covers(lines)
    }

    /// Sorted by start, the sections run from line 0 to the last line. A gap
    /// is allowed only where it holds an earlier duplicate of a kept date.
    fn covers(&self, lines: &[String]) -> bool {
        let mut sections: Vec<Section> = self.date_ranges.values().copied().collect();
        sections.sort_by_key(|s| s.start);
        let Some(last) = sections.last() else {
            return lines.is_empty();
        };
        if last.end + 1 != lines.len() {
            return false;
        }

        let mut next_line = 0;
        for section in sections {
            if section.start < next_line {
                return false;
            }
            if section.start > next_line && !self.is_superseded(&lines[next_line..section.start]) {
                return false;
            }
            next_line = section.end + 1;
        }
        true
    }

    /// Whether `gap` is a section whose date was indexed at a later header.
    fn is_superseded(&self, gap: &[String]) -> bool {
        gap.iter()
            .find(|l| !l.trim().is_empty())
            .and_then(|l| header_date_key(l))
            .is_some_and(|key| self.date_ranges.contains_key(key))
    }
}

/// An open task as presented for completion, numbered from 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenTask {
    pub number: usize,
    /// Line index in the journal
    pub position: usize,
    /// Task text without marker or line terminator
    pub text: String,
}

/// Any task line found by scanning, regardless of state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskLine {
    pub position: usize,
    pub marker: TaskMarker,
    pub text: String,
}

/// Strip a line's task marker and terminator, leaving the task text.
pub fn task_text(line: &str, marker: TaskMarker) -> String {
    line.strip_prefix(marker.prefix())
        .unwrap_or(line)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

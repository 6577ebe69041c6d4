use crate::model::journal::{JournalIndex, LineKind, Section, TaskMarker, classify};

/// The journal's first non-blank line is not a date header
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed journal: line {line} must be a date header like `# 2024-01-01 Monday`, found {found:?}")]
pub struct MalformedJournal {
    /// 1-based line number
    pub line: usize,
    pub found: String,
}

/// Split journal text into lines, each keeping its terminator.
///
/// Concatenating the result reproduces `source` byte for byte.
pub fn split_lines(source: &str) -> Vec<String> {
    source.split_inclusive('\n').map(str::to_string).collect()
}

/// Build the date-range map and open-task list for the given lines.
///
/// Single pass, whole file. Blank lines belong to whichever section is open;
/// leading blank lines are folded into the first section so the sections
/// always partition the file.
pub fn build_index(lines: &[String]) -> Result<JournalIndex, MalformedJournal> {
    let mut index = JournalIndex::default();
    let mut open: Option<(String, usize)> = None;

    for (i, line) in lines.iter().enumerate() {
        match classify(line) {
            LineKind::Blank => {}
            LineKind::Header(key) => {
                let start = match open.take() {
                    Some((prev_key, prev_start)) => {
                        // Duplicate dates: the later range replaces the earlier one
                        index
                            .date_ranges
                            .insert(prev_key, Section::new(prev_start, i - 1));
                        i
                    }
                    None => 0,
                };
                open = Some((key.to_string(), start));
            }
            _ if open.is_none() => {
                return Err(MalformedJournal {
                    line: i + 1,
                    found: line.trim_end().to_string(),
                });
            }
            LineKind::Task(TaskMarker::Open) => index.open_task_positions.push(i),
            LineKind::Task(_) | LineKind::Content => {}
        }
    }

    if let Some((key, start)) = open {
        index
            .date_ranges
            .insert(key, Section::new(start, lines.len() - 1));
    }

    Ok(index)
}

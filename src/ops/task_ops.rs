use crate::model::journal::{OpenTask, Section, TaskLine, TaskMarker, task_text};
use crate::ops::entry_ops::{insert_lines_after, terminated};

// ---------------------------------------------------------------------------
// Task lines
// ---------------------------------------------------------------------------

/// An open task line: `- [ ] text`
pub fn format_open_task(text: &str) -> String {
    terminated(format!("{}{}", TaskMarker::Open.prefix(), text.trim_end()))
}

/// Swap the marker at the start of a line, keeping the rest verbatim.
/// Returns false if the line doesn't carry `from`.
pub fn set_marker(line: &mut String, from: TaskMarker, to: TaskMarker) -> bool {
    if !line.starts_with(from.prefix()) {
        return false;
    }
    line.replace_range(..from.prefix().len(), to.prefix());
    true
}

/// Mark the open task at `position` as completed.
pub fn complete_task(lines: &mut [String], position: usize) -> bool {
    lines
        .get_mut(position)
        .is_some_and(|line| set_marker(line, TaskMarker::Open, TaskMarker::Completed))
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

/// Move every open task outside `target` into it.
///
/// Each task left behind is re-marked as migrated in place, and a fresh open
/// copy is appended at the end of `target`, in original file order. Positions
/// are visited back to front and the copies are inserted in a single splice
/// after all re-marking, so no visited position is shifted by an insertion.
/// Returns the number of tasks moved.
pub fn migrate_open_tasks(
    lines: &mut Vec<String>,
    open_task_positions: &[usize],
    target: Section,
) -> usize {
    let mut copies = Vec::new();
    for &pos in open_task_positions.iter().rev() {
        if target.contains(pos) {
            continue;
        }
        let Some(line) = lines.get_mut(pos) else {
            continue;
        };
        let copy = terminated(line.clone());
        if set_marker(line, TaskMarker::Open, TaskMarker::Migrated) {
            copies.push(copy);
        }
    }

    let moved = copies.len();
    if moved > 0 {
        copies.reverse();
        insert_lines_after(lines, target, copies);
    }
    moved
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// Open tasks at the given positions, numbered 1..K in file order.
pub fn open_tasks(lines: &[String], open_task_positions: &[usize]) -> Vec<OpenTask> {
    open_task_positions
        .iter()
        .filter_map(|&pos| lines.get(pos).map(|line| (pos, line)))
        .enumerate()
        .map(|(i, (position, line))| OpenTask {
            number: i + 1,
            position,
            text: task_text(line, TaskMarker::Open),
        })
        .collect()
}

/// Every task line in the file, in any state, found by scanning.
pub fn task_lines(lines: &[String]) -> Vec<TaskLine> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(position, line)| {
            TaskMarker::from_line(line).map(|marker| TaskLine {
                position,
                marker,
                text: task_text(line, marker),
            })
        })
        .collect()
}

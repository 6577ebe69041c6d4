use chrono::NaiveDate;

use crate::model::journal::{HEADER_MARKER, Section};
use crate::parse::split_lines;

/// `YYYY-MM-DD` key for a date
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Header line for a date: `# 2024-01-01 Monday \n`
pub fn format_header(date: NaiveDate) -> String {
    format!("{}{} \n", HEADER_MARKER, date.format("%Y-%m-%d %A"))
}

/// A free-form log entry: `- text`
pub fn format_log_entry(text: &str) -> String {
    terminated(format!("- {}", text.trim_end()))
}

/// Ensure `line` ends with a newline.
pub fn terminated(mut line: String) -> String {
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}

/// Append a new dated section at the end of the buffer.
///
/// Adds a blank separator unless the buffer is empty or already ends in a
/// blank line, then the header and a trailing blank line.
pub fn append_header(lines: &mut Vec<String>, header: String) {
    terminate_last_line(lines);
    if lines.last().is_some_and(|l| !l.trim().is_empty()) {
        lines.push("\n".to_string());
    }
    lines.push(terminated(header));
    lines.push("\n".to_string());
}

/// Insert `text` directly after the last line of `section`.
///
/// Text spanning several lines becomes several lines.
pub fn insert_after_section(lines: &mut Vec<String>, section: Section, text: &str) {
    insert_lines_after(lines, section, split_lines(&terminated(text.to_string())));
}

/// Insert several lines, in order, directly after the last line of `section`.
pub(crate) fn insert_lines_after(lines: &mut Vec<String>, section: Section, new_lines: Vec<String>) {
    if section.end + 1 == lines.len() {
        terminate_last_line(lines);
    }
    let at = (section.end + 1).min(lines.len());
    lines.splice(at..at, new_lines);
}

/// A file that doesn't end in a newline would otherwise glue the next line on.
fn terminate_last_line(lines: &mut [String]) {
    if let Some(last) = lines.last_mut()
        && !last.ends_with('\n')
    {
        last.push('\n');
    }
}

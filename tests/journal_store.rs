//! Library-level tests for the journal store: index shape, placement of
//! appended and migrated lines, crash safety, and cache independence.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use daily::io::backup::BackupManager;
use daily::io::index_cache::IndexCache;
use daily::io::journal_io::{JournalError, JournalStore};
use daily::model::journal::{JournalIndex, Section, TaskMarker};
use daily::parse::{DateMatcher, build_index, split_lines};

const SAMPLE: &str = include_str!("fixtures/sample_journal.md");

const TWO_DAYS: &str = "\
# 2024-01-01 Monday
- [ ] write report
- lunch

# 2024-01-02 Tuesday
- stand-up
";

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn write_journal(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("daily.md");
    fs::write(&path, content).unwrap();
    path
}

fn open(dir: &Path, path: &Path, cache: bool) -> JournalStore {
    JournalStore::open_with(
        path,
        IndexCache::new(dir.join("indexes.bin"), cache),
        BackupManager::new(dir.join("backups"), 10),
    )
    .unwrap()
}

fn open_content(content: &str, cache: bool) -> (TempDir, JournalStore) {
    let tmp = TempDir::new().unwrap();
    let path = write_journal(tmp.path(), content);
    let store = open(tmp.path(), &path, cache);
    (tmp, store)
}

/// Sections, sorted by start, cover every line exactly once.
fn assert_partition(index: &JournalIndex, len: usize) {
    let mut sections: Vec<Section> = index.date_ranges.values().copied().collect();
    sections.sort_by_key(|s| s.start);
    if len == 0 {
        assert!(sections.is_empty());
        return;
    }
    assert_eq!(sections.first().unwrap().start, 0);
    assert_eq!(sections.last().unwrap().end, len - 1);
    for pair in sections.windows(2) {
        assert_eq!(pair[0].end + 1, pair[1].start, "gap or overlap: {:?}", pair);
    }
}

// ---------------------------------------------------------------------------
// Index properties
// ---------------------------------------------------------------------------

#[test]
fn index_partitions_every_journal() {
    for content in [
        SAMPLE,
        TWO_DAYS,
        "",
        "\n\n# 2024-01-01 Monday \n",
        "# 2024-01-01 Monday \n- no trailing newline",
        "# 2024-01-01 Monday \n# 2024-01-02 Tuesday \n# 2024-01-03 Wednesday \n",
    ] {
        let lines = split_lines(content);
        let index = build_index(&lines).unwrap();
        assert_partition(&index, lines.len());
    }
}

#[test]
fn rebuilding_is_idempotent() {
    let lines = split_lines(SAMPLE);
    assert_eq!(build_index(&lines).unwrap(), build_index(&lines).unwrap());
}

#[test]
fn sample_index_shape() {
    let index = build_index(&split_lines(SAMPLE)).unwrap();
    let keys: Vec<&str> = index.date_ranges.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["2024-01-01", "2024-01-02", "2024-01-15", "2024-03-15"]);
    assert_eq!(index.section("2024-01-02"), Some(Section::new(6, 12)));
    assert_eq!(index.open_task_positions, vec![2, 8, 16]);
}

#[test]
fn duplicate_dates_keep_first_position_and_last_range() {
    let lines = split_lines(
        "# 2024-01-01 Monday \n- a\n# 2024-01-02 Tuesday \n# 2024-01-01 Monday \n- b\n",
    );
    let index = build_index(&lines).unwrap();
    let keys: Vec<&str> = index.date_ranges.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["2024-01-01", "2024-01-02"]);
    assert_eq!(index.section("2024-01-01"), Some(Section::new(3, 4)));
}

#[test]
fn wildcard_matching() {
    let m = DateMatcher::expand("2024-*-15").unwrap();
    assert!(m.is_match("2024-03-15"));
    assert!(m.is_match("2024-11-15"));
    assert!(!m.is_match("2024-03-16"));
    assert!(!m.is_match("2023-03-15"));

    let any_month = DateMatcher::expand("2024-*-01").unwrap();
    let any_month_later_day = DateMatcher::expand("2024-*-28").unwrap();
    for month in ["01", "06", "12"] {
        assert!(any_month.is_match(&format!("2024-{}-01", month)));
        assert!(any_month_later_day.is_match(&format!("2024-{}-28", month)));
    }

    let any_year = DateMatcher::expand("*-01-01").unwrap();
    assert!(any_year.is_match("1999-01-01"));
    assert!(!any_year.is_match("1999-01-02"));
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[test]
fn empty_journal_gets_one_header() {
    let (_tmp, mut store) = open_content("", false);
    assert!(store.ensure_header_for_date(date("2024-01-01")).unwrap());

    assert_eq!(
        fs::read_to_string(store.path()).unwrap(),
        "# 2024-01-01 Monday \n\n"
    );
    assert_eq!(store.index().date_ranges.len(), 1);
    assert_eq!(store.index().section("2024-01-01"), Some(Section::new(0, 1)));
}

#[test]
fn append_lands_at_end_of_section() {
    let (_tmp, mut store) = open_content(SAMPLE, false);
    let before = store.index().clone();
    let old = before.section("2024-01-02").unwrap();

    store.append_to_section("2024-01-02", "- late note").unwrap();

    let after = store.index();
    let grown = after.section("2024-01-02").unwrap();
    assert_eq!(grown.line_count(), old.line_count() + 1);
    assert_eq!(store.lines()[old.end + 1], "- late note\n");
    let next = after.section("2024-01-15").unwrap();
    assert_eq!(next.start, old.end + 2);

    for key in ["2024-01-01", "2024-01-15", "2024-03-15"] {
        assert_eq!(
            after.section(key).unwrap().line_count(),
            before.section(key).unwrap().line_count(),
            "{} changed size",
            key
        );
    }
}

#[test]
fn multiline_append_stays_one_line_per_element() {
    let tmp = TempDir::new().unwrap();
    let path = write_journal(tmp.path(), "# 2024-01-01 Monday \n- a\n");
    let mut store = open(tmp.path(), &path, true);

    store.append_to_section("2024-01-01", "- x\n- y").unwrap();

    let on_disk = split_lines(&fs::read_to_string(&path).unwrap());
    assert_eq!(store.lines(), on_disk.as_slice());
    assert_partition(store.index(), on_disk.len());
    assert_eq!(store.index(), &build_index(&on_disk).unwrap());

    let mut reopened = open(tmp.path(), &path, true);
    assert_eq!(reopened.index(), &build_index(&on_disk).unwrap());

    reopened.append_to_section("2024-01-01", "- z").unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "# 2024-01-01 Monday \n- a\n- x\n- y\n- z\n"
    );
}

#[test]
fn stale_cache_missing_trailing_lines_is_rebuilt() {
    let tmp = TempDir::new().unwrap();
    let path = write_journal(tmp.path(), "# 2024-01-01 Monday \n- a\n- b\n");
    // Written after the journal, so fresh by mtime, but one line short
    let short = build_index(&split_lines("# 2024-01-01 Monday \n- a\n")).unwrap();
    daily::io::index_cache::save(&tmp.path().join("indexes.bin"), &short).unwrap();

    let store = open(tmp.path(), &path, true);
    assert_eq!(store.index().section("2024-01-01"), Some(Section::new(0, 2)));
}

#[test]
fn append_to_missing_section_fails_without_writing() {
    let (_tmp, mut store) = open_content(SAMPLE, false);
    let err = store.append_to_section("2030-01-01", "- x").unwrap_err();
    assert!(matches!(err, JournalError::DateHeaderNotFound(_)));
    assert_eq!(fs::read_to_string(store.path()).unwrap(), SAMPLE);
    assert!(store.backups().list(store.path()).unwrap().is_empty());
}

#[test]
fn migrate_between_two_days() {
    let (_tmp, mut store) = open_content(TWO_DAYS, false);
    let open_before = store.index().open_task_positions.len();

    assert_eq!(store.migrate_open_tasks_to("2024-01-02").unwrap(), 1);

    assert_eq!(store.lines()[1], "- [>] write report\n");
    let today = store.index().section("2024-01-02").unwrap();
    assert_eq!(store.lines()[today.end], "- [ ] write report\n");
    assert_eq!(store.index().open_task_positions.len(), open_before);
    assert_eq!(store.index().open_task_positions, vec![today.end]);
}

#[test]
fn migrate_keeps_relative_positions_and_is_idempotent() {
    let (_tmp, mut store) = open_content(SAMPLE, false);
    store.ensure_header_for_date(date("2024-04-01")).unwrap();
    let before = store.lines().to_vec();
    let positions = store.index().open_task_positions.clone();

    assert_eq!(store.migrate_open_tasks_to("2024-04-01").unwrap(), 3);

    for &pos in &positions {
        assert_eq!(
            TaskMarker::from_line(&store.lines()[pos]),
            Some(TaskMarker::Migrated)
        );
        assert_eq!(
            store.lines()[pos].replacen("- [>] ", "- [ ] ", 1),
            before[pos]
        );
    }
    let target = store.index().section("2024-04-01").unwrap();
    let copies: Vec<&String> = store.lines()[target.range()]
        .iter()
        .filter(|l| l.starts_with("- [ ] "))
        .collect();
    assert_eq!(
        copies,
        vec!["- [ ] write report\n", "- [ ] call plumber\n", "- [ ] an older task\n"]
    );

    let snapshot = store.lines().to_vec();
    assert_eq!(store.migrate_open_tasks_to("2024-04-01").unwrap(), 0);
    assert_eq!(store.lines(), snapshot.as_slice());
}

#[test]
fn tasks_already_in_target_are_untouched() {
    let (_tmp, mut store) = open_content(SAMPLE, false);
    // 2024-01-15 already holds the open "an older task"
    assert_eq!(store.migrate_open_tasks_to("2024-01-15").unwrap(), 2);
    assert_eq!(store.lines()[16], "- [ ] an older task\n");
}

// ---------------------------------------------------------------------------
// Crash safety
// ---------------------------------------------------------------------------

#[test]
fn failed_write_restores_journal_byte_for_byte() {
    let tmp = TempDir::new().unwrap();
    let path = write_journal(tmp.path(), SAMPLE);
    let manager = BackupManager::new(tmp.path().join("backups"), 2);
    let lines = split_lines(SAMPLE);

    let err = manager
        .with_backup(
            &path,
            &lines,
            |lines| {
                lines.clear();
                lines.push("half-written".to_string());
                Some(())
            },
            |_| Err(JournalError::DateHeaderNotFound("simulated".into())),
        )
        .unwrap_err();

    assert!(matches!(err, JournalError::WriteFailed { .. }));
    assert_eq!(fs::read(&path).unwrap(), SAMPLE.as_bytes());
    assert_eq!(manager.list(&path).unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Cache independence
// ---------------------------------------------------------------------------

fn run_session(cache: bool) -> (String, JournalIndex) {
    let (_tmp, mut store) = open_content(SAMPLE, cache);
    store.ensure_header_for_date(date("2024-04-01")).unwrap();
    store.append_to_section("2024-04-01", "- [ ] plan week").unwrap();
    store.migrate_open_tasks_to("2024-04-01").unwrap();
    store.complete_task(2).unwrap();
    store.append_to_section("2024-01-02", "- remembered later").unwrap();
    (store.lines().concat(), store.index().clone())
}

#[test]
fn results_match_with_and_without_cache() {
    assert_eq!(run_session(true), run_session(false));
}

#[test]
fn reopening_uses_a_fresh_cache() {
    let tmp = TempDir::new().unwrap();
    let path = write_journal(tmp.path(), SAMPLE);
    let mut store = open(tmp.path(), &path, true);
    store.append_to_section("2024-03-15", "- added").unwrap();
    let expected = store.index().clone();

    assert_eq!(
        daily::io::index_cache::load(&tmp.path().join("indexes.bin")).unwrap(),
        expected
    );
    let reopened = open(tmp.path(), &path, true);
    assert_eq!(reopened.index(), &expected);
}

#[test]
fn corrupt_cache_falls_back_to_rebuild() {
    let tmp = TempDir::new().unwrap();
    let path = write_journal(tmp.path(), SAMPLE);
    fs::write(tmp.path().join("indexes.bin"), b"not an index").unwrap();

    let store = open(tmp.path(), &path, true);
    assert_eq!(store.index(), &build_index(&split_lines(SAMPLE)).unwrap());
}

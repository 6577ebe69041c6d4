use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::cli::commands::InitArgs;
use crate::cli::prompt::ConsolePrompt;
use crate::io::config_io::{self, ConfigSettings};

/// What `daily init` wrote
#[derive(Debug)]
pub(crate) struct InitOutcome {
    pub settings: ConfigSettings,
    pub journal_created: bool,
    pub updated_existing: bool,
}

pub fn cmd_init(
    args: InitArgs,
    config_path: PathBuf,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let mut prompt = ConsolePrompt::new(stdin.lock(), std::io::stdout());
    let outcome = run_init(args, &config_path, yes, &mut prompt)?;

    if outcome.journal_created {
        println!("Created {}", outcome.settings.file_path.display());
    }
    let verb = if outcome.updated_existing { "Updated" } else { "Wrote" };
    println!("{} {}", verb, config_path.display());
    println!("  journal: {}", outcome.settings.file_path.display());
    println!("  backups kept: {}", outcome.settings.num_backups_to_keep);
    println!("  index cache: {}", if outcome.settings.save_index { "on" } else { "off" });
    Ok(())
}

/// Collect settings from flags, asking on `prompt` for anything missing
/// unless `yes` accepts the defaults, then write the config.
pub(crate) fn run_init<R: BufRead, W: Write>(
    args: InitArgs,
    config_path: &Path,
    yes: bool,
    prompt: &mut ConsolePrompt<R, W>,
) -> Result<InitOutcome, Box<dyn std::error::Error>> {
    let existing = config_path.is_file();
    if existing && !args.force {
        return Err(format!(
            "config already exists at {}; pass --force to update it",
            config_path.display()
        )
        .into());
    }

    let defaults = ConfigSettings::default();
    let interactive = !yes;

    // Journal file
    let file_path = match args.file {
        Some(file) => {
            config_io::validate_journal_path(&file)?;
            file
        }
        None if !interactive => defaults.file_path.clone(),
        None => loop {
            let answer = prompt
                .ask("Journal file (default=daily.md): ")
                .ok_or("init cancelled")?;
            let candidate = if answer.is_empty() {
                defaults.file_path.clone()
            } else {
                PathBuf::from(answer)
            };
            match config_io::validate_journal_path(&candidate) {
                Ok(()) => break candidate,
                Err(e) => println!("{}", e),
            }
        },
    };
    let file_path = std::path::absolute(&file_path)?;

    let mut journal_created = false;
    if !file_path.is_file() {
        let create = !interactive
            || prompt.confirm(&format!(
                "{} does not exist. Create it? (y/n) ",
                file_path.display()
            ));
        if !create {
            return Err("no journal file; nothing written".into());
        }
        if let Some(dir) = file_path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&file_path, "")?;
        journal_created = true;
    }

    // Backups
    let backups_dir = match args.backups_dir {
        Some(dir) => Some(std::path::absolute(dir)?),
        None if !interactive => None,
        None => {
            let answer = prompt
                .ask("Backups directory (default=backups/ beside the config): ")
                .unwrap_or_default();
            if answer.is_empty() {
                None
            } else {
                Some(std::path::absolute(answer)?)
            }
        }
    };

    let num_backups_to_keep = match args.keep {
        Some(n) => n,
        None if !interactive => defaults.num_backups_to_keep,
        None => loop {
            let answer = prompt
                .ask(&format!(
                    "Backups to keep (default={}): ",
                    defaults.num_backups_to_keep
                ))
                .unwrap_or_default();
            if answer.is_empty() {
                break defaults.num_backups_to_keep;
            }
            match answer.parse::<usize>() {
                Ok(n) if n > 0 => break n,
                _ => println!("Please enter a whole number above zero."),
            }
        },
    };

    // Index cache
    let save_index = if args.no_index {
        false
    } else if !interactive {
        defaults.save_index
    } else {
        let answer = prompt
            .ask("Cache the date index (y/n, default=y): ")
            .unwrap_or_default()
            .to_lowercase();
        answer.is_empty() || answer == "y" || answer == "yes"
    };

    let settings = ConfigSettings {
        file_path,
        backups_dir,
        num_backups_to_keep,
        save_index,
    };

    // Keep the user's comments and other keys when updating
    let doc = if existing {
        let (_config, mut doc) = config_io::read_config(config_path)?;
        config_io::apply_settings(&mut doc, &settings);
        doc
    } else {
        config_io::new_config_document(&settings)
    };
    config_io::write_config(config_path, &doc)?;

    Ok(InitOutcome {
        settings,
        journal_created,
        updated_existing: existing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::JournalConfig;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn prompt(input: &str) -> ConsolePrompt<Cursor<String>, Vec<u8>> {
        ConsolePrompt::new(Cursor::new(input.to_string()), Vec::new())
    }

    #[test]
    fn test_init_with_flags_and_yes() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("conf/config.toml");
        let journal = tmp.path().join("notes/daily.md");

        let args = InitArgs {
            file: Some(journal.clone()),
            keep: Some(3),
            no_index: true,
            ..InitArgs::default()
        };
        let outcome = run_init(args, &config_path, true, &mut prompt("")).unwrap();

        assert!(outcome.journal_created);
        assert!(journal.is_file());
        let config: JournalConfig = config_io::load_config(&config_path).unwrap();
        assert_eq!(config.journal_path(), journal);
        assert_eq!(config.num_backups_to_keep, 3);
        assert!(!config.save_index);
        assert_eq!(config.backups_dir(), tmp.path().join("conf/backups"));
    }

    #[test]
    fn test_init_interactive_reasks_bad_answers() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        let bad = tmp.path().join("daily.docx");
        let good = tmp.path().join("daily.txt");
        let input = format!("{}\n{}\ny\n\nzero\n4\nn\n", bad.display(), good.display());

        let outcome = run_init(InitArgs::default(), &config_path, false, &mut prompt(&input)).unwrap();

        assert_eq!(outcome.settings.file_path, good);
        assert!(outcome.journal_created);
        assert_eq!(outcome.settings.num_backups_to_keep, 4);
        assert!(!outcome.settings.save_index);
        assert_eq!(outcome.settings.backups_dir, None);
    }

    #[test]
    fn test_init_declining_creation_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        let args = InitArgs {
            file: Some(tmp.path().join("daily.md")),
            ..InitArgs::default()
        };
        assert!(run_init(args, &config_path, false, &mut prompt("n\n")).is_err());
        assert!(!config_path.exists());
        assert!(!tmp.path().join("daily.md").exists());
    }

    #[test]
    fn test_init_rejects_unsupported_flag_file() {
        let tmp = TempDir::new().unwrap();
        let args = InitArgs {
            file: Some(tmp.path().join("daily.pdf")),
            ..InitArgs::default()
        };
        let err = run_init(args, &tmp.path().join("config.toml"), true, &mut prompt("")).unwrap_err();
        assert!(err.to_string().contains(".pdf files are not supported"));
    }

    #[test]
    fn test_init_existing_needs_force_and_keeps_comments() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        let journal = tmp.path().join("daily.md");
        fs::write(&journal, "").unwrap();
        fs::write(&config_path, "# my notes\nfile_path = \"old.md\"\n").unwrap();

        let args = || InitArgs {
            file: Some(journal.clone()),
            ..InitArgs::default()
        };
        assert!(run_init(args(), &config_path, true, &mut prompt("")).is_err());

        let outcome = run_init(
            InitArgs {
                force: true,
                ..args()
            },
            &config_path,
            true,
            &mut prompt(""),
        )
        .unwrap();
        assert!(outcome.updated_existing);
        assert!(!outcome.journal_created);
        let text = fs::read_to_string(&config_path).unwrap();
        assert!(text.starts_with("# my notes\n"));
        assert!(text.contains(&journal.display().to_string()));
    }
}

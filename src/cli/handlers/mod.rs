mod init;
pub use init::cmd_init;

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::cli::prompt::ConsolePrompt;
use crate::io::backup::BackupManager;
use crate::io::config_io;
use crate::io::index_cache::IndexCache;
use crate::io::journal_io::JournalStore;
use crate::model::config::JournalConfig;
use crate::ops::entry_ops::{date_key, format_header, format_log_entry};
use crate::ops::task_ops::format_open_task;

/// Per-invocation settings shared by every command
struct Context {
    config_flag: Option<PathBuf>,
    json: bool,
    yes: bool,
    today: NaiveDate,
}

impl Context {
    fn config_path(&self) -> Result<PathBuf, config_io::ConfigError> {
        config_io::config_path(self.config_flag.as_deref())
    }

    fn load_config(&self) -> Result<JournalConfig, config_io::ConfigError> {
        let path = self.config_path()?;
        debug!(config = %path.display(), "loading config");
        config_io::load_config(&path)
    }

    fn load_store(&self) -> Result<JournalStore, Box<dyn std::error::Error>> {
        let config = self.load_config()?;
        Ok(JournalStore::open(&config)?)
    }

    fn today_key(&self) -> String {
        date_key(self.today)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context {
        config_flag: cli.config,
        json: cli.json,
        yes: cli.yes,
        today: Local::now().date_naive(),
    };

    match cli.command {
        None => cmd_print_today(&ctx),
        Some(cmd) => match cmd {
            Commands::Init(args) => cmd_init(args, ctx.config_path()?, ctx.yes),

            // Write commands
            Commands::Log(args) => cmd_add_entry(&ctx, &format_log_entry(&args.joined())),
            Commands::Todo(args) => cmd_add_entry(&ctx, &format_open_task(&args.joined())),
            Commands::Migrate => cmd_migrate(&ctx),
            Commands::Complete(args) => cmd_complete(&ctx, args),

            // Read commands
            Commands::Print(args) => cmd_print(&ctx, args),
            Commands::Backups => cmd_backups(&ctx),

            // Maintenance
            Commands::Cache(args) => match args.action {
                CacheAction::Clear => cmd_cache_clear(&ctx),
            },
        },
    }
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

/// `log` and `todo`: make sure today has a header, then append the line.
fn cmd_add_entry(ctx: &Context, line: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ctx.load_store()?;
    let key = ctx.today_key();
    let header_created = store.ensure_header_for_date(ctx.today)?;
    store.append_to_section(&key, line)?;

    if ctx.json {
        let output = MutationJson {
            date: key,
            header_created: Some(header_created),
            migrated: None,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if header_created {
            println!("Created {}", format_header(ctx.today).trim_end());
        }
        println!("{}", line.trim_end());
    }
    Ok(())
}

fn cmd_migrate(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ctx.load_store()?;
    let key = ctx.today_key();
    store.ensure_header_for_date(ctx.today)?;
    let moved = store.migrate_open_tasks_to(&key)?;

    if ctx.json {
        let output = MutationJson {
            date: key,
            header_created: None,
            migrated: Some(moved),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if moved == 0 {
        println!("No open tasks to migrate.");
    } else {
        println!(
            "Migrated {} open task{} to {}",
            moved,
            if moved == 1 { "" } else { "s" },
            key
        );
    }
    Ok(())
}

fn cmd_complete(ctx: &Context, args: CompleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ctx.load_store()?;

    if let Some(number) = args.number {
        let task = store.complete_task(number)?;
        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&task)?);
        } else {
            println!("Completed: {}", task.text);
        }
        return Ok(());
    }

    let stdin = std::io::stdin();
    let mut prompt = ConsolePrompt::new(stdin.lock(), std::io::stdout());
    let completed = store.complete_tasks_interactively(&mut prompt)?;
    println!(
        "Completed {} task{}.",
        completed,
        if completed == 1 { "" } else { "s" }
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_print(ctx: &Context, args: PrintArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.target.as_deref() {
        None | Some("today") => cmd_print_today(ctx),
        Some("todo") => cmd_print_todo(ctx),
        Some("tasks") => cmd_print_tasks(ctx),
        Some("config") => cmd_print_config(ctx),
        Some(pattern) => cmd_print_pattern(ctx, pattern),
    }
}

/// Print today's section, offering to create its header when missing.
fn cmd_print_today(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ctx.load_store()?;
    let key = ctx.today_key();

    if let Some(lines) = store.section_lines(&key) {
        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&section_to_json(&key, &lines))?);
        } else {
            print_lines(&format_section(&lines));
        }
        return Ok(());
    }

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&section_to_json(&key, &[]))?);
        return Ok(());
    }

    let create = ctx.yes || {
        let stdin = std::io::stdin();
        let mut prompt = ConsolePrompt::new(stdin.lock(), std::io::stdout());
        prompt.confirm("Today's header not found. Create it now? (y/n) ")
    };
    if create && store.ensure_header_for_date(ctx.today)? {
        println!("Created {}", format_header(ctx.today).trim_end());
    }
    Ok(())
}

fn cmd_print_todo(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.load_store()?;
    let tasks = store.open_tasks();
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else {
        print_lines(&format_banner("TODO LIST"));
        print_lines(&format_task_list(&tasks));
    }
    Ok(())
}

fn cmd_print_tasks(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.load_store()?;
    let tasks = store.task_lines();
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else {
        print_lines(&format_banner("ALL TASKS"));
        print_lines(&format_all_tasks(&tasks));
    }
    Ok(())
}

fn cmd_print_config(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let config = ctx.load_config()?;
    let values = config.values();
    if ctx.json {
        let map: serde_json::Map<String, serde_json::Value> = values
            .into_iter()
            .map(|(name, value)| (name.to_string(), serde_json::Value::String(value)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        print_lines(&format_config(&values));
    }
    Ok(())
}

fn cmd_print_pattern(ctx: &Context, pattern: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.load_store()?;
    let sections = store.sections_matching(pattern)?;

    if ctx.json {
        let output: Vec<SectionJson> = sections
            .iter()
            .map(|(date, lines)| section_to_json(date, lines))
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if sections.is_empty() {
        println!("No sections match {}", pattern);
    } else {
        for (_, lines) in &sections {
            print_lines(&format_section(lines));
        }
    }
    Ok(())
}

fn cmd_backups(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let config = ctx.load_config()?;
    let manager = BackupManager::new(config.backups_dir(), config.num_backups_to_keep);
    let backups = manager.list(&config.journal_path())?;

    if ctx.json {
        let output: Vec<BackupJson> = backups.iter().map(backup_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_lines(&format_backups(&backups));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

fn cmd_cache_clear(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let config = ctx.load_config()?;
    let cache = IndexCache::new(config.index_path(), config.save_index);
    if cache.clear()? {
        println!("Removed {}", cache.path().display());
    } else {
        println!("No index cache at {}", cache.path().display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

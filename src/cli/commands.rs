use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "daily", about = concat!("daily v", env!("CARGO_PKG_VERSION"), " - one markdown file, one section per day"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to use (default: $DAILY_CONFIG, then ~/.config/daily/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or update the config file
    Init(InitArgs),
    /// Log an entry under today's header
    Log(TextArgs),
    /// Add an open task under today's header
    Todo(TextArgs),
    /// Move open tasks from earlier days into today
    Migrate,
    /// Mark open tasks as completed
    Complete(CompleteArgs),
    /// Print today, sections matching a date pattern, or a listing
    Print(PrintArgs),
    /// Manage the index cache
    Cache(CacheCmd),
    /// List retained journal backups, newest first
    Backups,
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args, Default)]
pub struct InitArgs {
    /// Journal file (.md or .txt)
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
    /// Directory for journal backups
    #[arg(long, value_name = "DIR")]
    pub backups_dir: Option<PathBuf>,
    /// Number of backups to keep
    #[arg(long, value_name = "N")]
    pub keep: Option<usize>,
    /// Don't cache the date index between runs
    #[arg(long)]
    pub no_index: bool,
    /// Overwrite settings in an existing config file
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Journal command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TextArgs {
    /// Entry text (words are joined with spaces)
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

impl TextArgs {
    pub fn joined(&self) -> String {
        self.text.join(" ")
    }
}

#[derive(Args)]
pub struct CompleteArgs {
    /// Open task number to complete (default: choose interactively)
    pub number: Option<usize>,
}

#[derive(Args)]
pub struct PrintArgs {
    /// Date pattern like 2024-*-15, or one of: todo, tasks, config (default: today)
    pub target: Option<String>,
}

#[derive(Args)]
pub struct CacheCmd {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Delete the index cache file
    Clear,
}

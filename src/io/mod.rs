pub mod backup;
pub mod config_io;
pub mod index_cache;
pub mod journal_io;
pub mod recovery;

pub use journal_io::{JournalError, JournalStore, Prompt, Selection};

pub mod date_pattern;
pub mod index_parser;

pub use date_pattern::{DateMatcher, PatternError};
pub use index_parser::{MalformedJournal, build_index, split_lines};

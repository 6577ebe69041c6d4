pub mod config;
pub mod journal;

pub use config::*;
pub use journal::*;

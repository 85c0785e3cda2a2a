//! The `coderag` command-line interface: configuration loading, directory
//! ingestion and the search, ask, chat, status and clear commands.

pub mod chunking;
mod codebase_cmd;
pub mod config;
pub mod ingest;

pub use codebase_cmd::{AskArgs, ClearArgs, Cli, Command, IndexArgs, SearchArgs, StatusArgs};

//! Command-line interface for ideaforge.
//!
//! Provides commands for project management, drafting, chat-assisted
//! writing and critic reviews.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};

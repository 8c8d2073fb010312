//! Command-line interface for longchain-judge.
//!
//! Provides the `evaluate` and `average` commands.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};

//! CLI module
//!
//! Command-line interface for running the tap.
//!
//! # Commands
//!
//! - `check` - Test connection to Firestore
//! - `discover` - List available streams
//! - `read` - Extract documents from streams

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;

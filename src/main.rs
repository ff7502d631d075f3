//! tap-firestore CLI
//!
//! Extracts Firestore collections as JSON-line messages

use clap::Parser;
use tap_firestore::cli::{Cli, Runner};
use tap_firestore::LogLevel;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Logs go to stderr; stdout carries messages only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::from(level).into()),
        )
        .init();

    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

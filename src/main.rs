//! chainbuild CLI entry point.
//!
//! Parses arguments, runs the orchestrator on the current directory, and
//! renders any failure with context before exiting non-zero.

use anyhow::Result;
use chainbuild::cli::Cli;
use chainbuild::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}

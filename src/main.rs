//! Braid CLI entry point
//!
//! Handles command-line argument parsing, error display, and command
//! execution. The CLI supports:
//! - `compile` - Compile a recipe into its merged document and artifacts
//! - `agents` - Generate subagent artifacts for a recipe
//! - `cycles` - Report dependency cycles across the corpus
//! - `list` - List discoverable recipes

use anyhow::Result;
use braid_cli::cli;
use braid_cli::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}

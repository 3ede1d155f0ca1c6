//! Command-line interface for Braid.
//!
//! Each command is implemented in its own module with its own argument
//! struct and execution logic. The CLI is a thin shell over the library:
//! the compile pipeline, subagent generation, and cycle detection all live
//! in the core modules, and the commands here handle argument parsing,
//! logging setup, output-file layout, and the compile summary.
//!
//! # Available Commands
//!
//! - `compile` - Compile a recipe into a merged document plus side-artifacts
//! - `agents` - Generate subagent artifacts for a recipe
//! - `cycles` - Report dependency cycles across the corpus (advisory)
//! - `list` - List recipes discoverable through both layers
//!
//! # Global Options
//!
//! - `--root <dir>` - Compile root (defaults to the current directory)
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors

mod agents;
mod compile;
mod cycles;
mod list;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI application structure for Braid.
///
/// Handles global flags and delegates to subcommands for specific
/// operations.
#[derive(Parser)]
#[command(
    name = "braid",
    about = "Braid - compile recipe-declared context bundles for coding agents",
    version,
    author
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Compile root directory (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Enable verbose (debug) output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a recipe into its merged document and side-artifacts
    Compile(compile::CompileCommand),
    /// Generate subagent artifacts for a recipe
    Agents(agents::AgentsCommand),
    /// Report dependency cycles across the local corpus
    Cycles(cycles::CyclesCommand),
    /// List recipes discoverable through the base and override layers
    List(list::ListCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        let root = match &self.root {
            Some(root) => std::fs::canonicalize(root)?,
            None => std::env::current_dir()?,
        };

        match self.command {
            Commands::Compile(cmd) => cmd.execute(&root).await,
            Commands::Agents(cmd) => cmd.execute(&root).await,
            Commands::Cycles(cmd) => cmd.execute(&root),
            Commands::List(cmd) => cmd.execute(&root),
        }
    }

    fn init_logging(&self) {
        use tracing_subscriber::EnvFilter;

        let default_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

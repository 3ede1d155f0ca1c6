//! The `cycles` command.
//!
//! Advisory report of dependency cycles across the local corpus. Cycles are
//! expected to compile fine; the report exists so authors can find
//! accidental loops. The command always exits successfully.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::cycles::detect_cycles;

/// Arguments for the `cycles` command.
#[derive(Args)]
pub struct CyclesCommand {
    /// Corpus directory to scan (defaults to the compile root)
    #[arg(value_name = "DIR")]
    corpus: Option<PathBuf>,
}

impl CyclesCommand {
    /// Run the scan and print the report.
    pub fn execute(self, root: &Path) -> Result<()> {
        let corpus = self.corpus.unwrap_or_else(|| root.to_path_buf());
        let cycles = detect_cycles(&corpus)?;

        if cycles.is_empty() {
            println!("{} no dependency cycles found", "✓".green());
        } else {
            println!(
                "{} {} dependency cycle(s) found (informational, compiles are unaffected):",
                "!".yellow(),
                cycles.len()
            );
            for cycle in &cycles {
                println!("  {cycle}");
            }
        }
        Ok(())
    }
}

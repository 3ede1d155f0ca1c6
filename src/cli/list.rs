//! The `list` command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::Path;

use crate::recipe::RecipeLoader;

/// Arguments for the `list` command.
#[derive(Args)]
pub struct ListCommand {
    /// Show each recipe's description and declared counts
    #[arg(long)]
    details: bool,
}

impl ListCommand {
    /// List recipes discoverable through both layers.
    pub fn execute(self, root: &Path) -> Result<()> {
        let loader = RecipeLoader::new(root);
        let names = loader.list();
        if names.is_empty() {
            println!("No recipes found under {}", root.join("recipes").display());
            return Ok(());
        }

        for name in names {
            if !self.details {
                println!("{name}");
                continue;
            }
            match loader.load(&name) {
                Ok(recipe) => {
                    let description = recipe.description.as_deref().unwrap_or("");
                    println!(
                        "{} ({} files, {} sources, {} agents) {}",
                        name.bold(),
                        recipe.files.len(),
                        recipe.sources.len(),
                        recipe.agents.len(),
                        description.dimmed()
                    );
                }
                Err(e) => println!("{} {}", name.bold(), format!("(unloadable: {e})").red()),
            }
        }
        Ok(())
    }
}

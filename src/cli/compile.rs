//! The `compile` command.
//!
//! Loads the recipe through both layers, runs the graph compiler, enforces
//! the registration and structure invariants, and lays the result out under
//! the output directory:
//!
//! ```text
//! <out>/<recipe>.md      merged output document
//! <out>/commands/*.md    extracted command files
//! <out>/skills/*.md      compiled skill bundles
//! <out>/bin/*            scripts, copied byte-for-byte
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::agents::SubagentBuilder;
use crate::compiler::{CompiledOutput, Compiler};
use crate::recipe::RecipeLoader;
use crate::source::SourceResolver;

/// Arguments for the `compile` command.
#[derive(Args)]
pub struct CompileCommand {
    /// Name of the recipe to compile
    recipe: String,

    /// Output directory for the compiled artifacts
    #[arg(long, short, default_value = "build", value_name = "DIR")]
    out: PathBuf,

    /// Print the compile summary without writing any files
    #[arg(long)]
    dry_run: bool,
}

impl CompileCommand {
    /// Run the compile.
    pub async fn execute(self, root: &Path) -> Result<()> {
        let loader = RecipeLoader::new(root);
        let recipe = loader.load(&self.recipe)?;
        let mut resolver = SourceResolver::new(root);

        let output = Compiler::new(&mut resolver).compile(&recipe).await?;

        let builder = SubagentBuilder::new(&loader, &mut resolver);
        builder.validate_parent_structure(&recipe)?;
        builder.validate_registration(&recipe, &output)?;
        let capabilities = builder.effective_capabilities(&recipe);

        if !self.dry_run {
            let out = if self.out.is_absolute() {
                self.out.clone()
            } else {
                root.join(&self.out)
            };
            write_artifacts(&out, &recipe.output_name(), &output)?;
        }

        print_summary(&recipe.name, &output, &capabilities);
        Ok(())
    }
}

/// Write the merged document and side-artifacts under `out`.
pub fn write_artifacts(out: &Path, document_name: &str, output: &CompiledOutput) -> Result<()> {
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory {}", out.display()))?;
    std::fs::write(out.join(document_name), output.render())?;

    for (subdir, sources) in
        [("commands", &output.commands), ("skills", &output.skills)]
    {
        if sources.is_empty() {
            continue;
        }
        let dir = out.join(subdir);
        std::fs::create_dir_all(&dir)?;
        for source in sources {
            let Some(name) = source.reference.locator.file_name() else {
                continue;
            };
            std::fs::write(dir.join(name), &source.body)?;
        }
    }

    if !output.scripts.is_empty() {
        let dir = out.join("bin");
        std::fs::create_dir_all(&dir)?;
        for source in &output.scripts {
            let Some(name) = source.reference.locator.file_name() else {
                continue;
            };
            let target = dir.join(name);
            // Byte-for-byte: the raw content, never a merged form.
            std::fs::write(&target, &source.raw)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))?;
            }
        }
    }

    Ok(())
}

fn print_summary(recipe: &str, output: &CompiledOutput, capabilities: &[String]) {
    println!(
        "{} compiled recipe '{}': {} sections, {} commands, {} skills, {} scripts",
        "✓".green(),
        recipe.bold(),
        output.body.len(),
        output.commands.len(),
        output.skills.len(),
        output.scripts.len()
    );
    if !capabilities.is_empty() {
        println!("  capabilities: {}", capabilities.join(", "));
    }
}

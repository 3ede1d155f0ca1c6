//! The `agents` command.
//!
//! Generates one artifact per declared subagent: the subagent recipe's
//! independently compiled document, fronted by generated metadata carrying
//! the dispatch name, model override, and transitive capability set.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::agents::{SubagentArtifact, SubagentBuilder};
use crate::recipe::RecipeLoader;
use crate::source::SourceResolver;

/// Arguments for the `agents` command.
#[derive(Args)]
pub struct AgentsCommand {
    /// Name of the recipe whose subagents to generate
    recipe: String,

    /// Output directory for the generated artifacts
    #[arg(long, short, default_value = "build", value_name = "DIR")]
    out: PathBuf,
}

/// Frontmatter generated onto each subagent artifact.
#[derive(Serialize)]
struct AgentFrontmatter<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "slice_is_empty")]
    capabilities: &'a [String],
}

fn slice_is_empty(slice: &&[String]) -> bool {
    slice.is_empty()
}

impl AgentsCommand {
    /// Generate the subagent artifacts.
    pub async fn execute(self, root: &Path) -> Result<()> {
        let loader = RecipeLoader::new(root);
        let recipe = loader.load(&self.recipe)?;
        let mut resolver = SourceResolver::new(root);

        let artifacts = SubagentBuilder::new(&loader, &mut resolver).generate(&recipe).await?;
        if artifacts.is_empty() {
            println!("Recipe '{}' declares no subagents", recipe.name);
            return Ok(());
        }

        let out = if self.out.is_absolute() {
            self.out
        } else {
            root.join(&self.out)
        };
        let dir = out.join("agents");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        for artifact in &artifacts {
            let path = dir.join(format!("{}.md", artifact.name));
            std::fs::write(&path, render_artifact(artifact)?)?;
            println!(
                "{} generated subagent '{}' ({} sections)",
                "✓".green(),
                artifact.name.bold(),
                artifact.output.body.len()
            );
        }
        Ok(())
    }
}

fn render_artifact(artifact: &SubagentArtifact) -> Result<String> {
    let frontmatter = AgentFrontmatter {
        name: &artifact.name,
        model: artifact.model.as_deref(),
        capabilities: &artifact.capabilities,
    };
    let yaml = serde_yaml::to_string(&frontmatter)?;
    Ok(format!("---\n{yaml}---\n\n{}", artifact.output.render()))
}

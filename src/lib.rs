//! Braid - a recipe compiler for coding-agent context bundles
//!
//! Braid takes a declarative "recipe" naming a bundle of source references
//! and produces one merged output document plus categorized side-artifacts
//! (extracted command files, skill bundles, subagent definitions, copied
//! executable scripts) for consumption by an assistant runtime.
//!
//! # Architecture Overview
//!
//! The compile pipeline resolves a directed, potentially cyclic graph of
//! file dependencies drawn from three providers:
//! - **Local filesystem** with override-shadowing (compile root, then a
//!   user overlay, then packaged defaults)
//! - **Remote repositories**, batch-fetched with one archive request per
//!   `repo@branch` group
//! - **Recipe-membership scans** contributing implicit roots from
//!   frontmatter `recipes:` declarations
//!
//! Traversal is depth-first over an explicit double-ended queue with
//! deferred emission, so a dependency's content always precedes its
//! dependent in the merged document, every source appears exactly once,
//! and cyclic graphs compile safely.
//!
//! # Core Modules
//!
//! - [`core`] - Error types, source references, canonical keys, categories
//! - [`markdown`] - Frontmatter splitting (metadata map + publishable body)
//! - [`recipe`] - Recipe loading with base/override layering and merging
//! - [`source`] - Source resolution across the three providers
//! - [`resolver`] - Dependency edge extraction with provider locality
//! - [`compiler`] - The depth-first squash driver
//! - [`agents`] - Subagent generation and structural validation
//! - [`cycles`] - Advisory corpus-wide cycle detection
//! - [`cli`] - Command-line interface
//!
//! # Recipe Format (recipes/<name>.toml)
//!
//! ```toml
//! description = "Context bundle for the demo workflow"
//! files = ["intro.md", "guides/style.md"]
//! capabilities = ["bash"]
//!
//! # Remote sources, grouped per repo@branch for batch fetching
//! [[sources]]
//! repo = "acme/handbook"
//! branch = "main"
//! path = "docs/process.md"
//!
//! # Subagents, each compiled independently from its own recipe
//! [[agents]]
//! name = "reviewer"
//! recipe = "reviewer"
//! model = "opus"
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Compile a recipe into build/
//! braid compile demo
//!
//! # Generate subagent artifacts
//! braid agents demo
//!
//! # Advisory cycle report over the corpus
//! braid cycles
//!
//! # List recipes from both layers
//! braid list --details
//! ```

// Core functionality modules
pub mod compiler;
pub mod core;
pub mod markdown;
pub mod recipe;
pub mod resolver;
pub mod source;

// Structure and diagnostics
pub mod agents;
pub mod cycles;

// Supporting modules
pub mod cli;
pub mod utils;

use std::path::Path;

use anyhow::Result;

pub use compiler::CompiledOutput;
pub use cycles::{Cycle, detect_cycles};

/// Compile a recipe by name: the full pipeline including registration and
/// structure validation.
///
/// # Errors
///
/// Returns [`core::BraidError::StructuralViolation`] or
/// [`core::BraidError::MissingRegistration`] on an invariant breach, and
/// recipe loading errors when the recipe itself is missing or malformed.
/// Unresolvable sources are not errors; they drop from the output with a
/// warning.
pub async fn compile(root: &Path, recipe_name: &str) -> Result<CompiledOutput> {
    let loader = recipe::RecipeLoader::new(root);
    let recipe = loader.load(recipe_name)?;
    let mut resolver = source::SourceResolver::new(root);

    let output = compiler::Compiler::new(&mut resolver).compile(&recipe).await?;

    let builder = agents::SubagentBuilder::new(&loader, &mut resolver);
    builder.validate_parent_structure(&recipe)?;
    builder.validate_registration(&recipe, &output)?;
    Ok(output)
}

/// Compile every subagent declared by a recipe, returning
/// `(name, compiled output)` pairs in declaration order.
pub async fn generate_subagents(
    root: &Path,
    recipe_name: &str,
) -> Result<Vec<(String, CompiledOutput)>> {
    let loader = recipe::RecipeLoader::new(root);
    let recipe = loader.load(recipe_name)?;
    let mut resolver = source::SourceResolver::new(root);

    let artifacts = agents::SubagentBuilder::new(&loader, &mut resolver).generate(&recipe).await?;
    Ok(artifacts.into_iter().map(|artifact| (artifact.name, artifact.output)).collect())
}

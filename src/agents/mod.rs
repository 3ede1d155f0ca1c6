//! Subagent generation and structural validation.
//!
//! A subagent is a named, independently compiled artifact dispatched to a
//! separate execution context. Each declared `{name, recipe}` pair loads its
//! recipe fresh (layered merge included) and runs the graph compiler
//! independently of the parent's own traversal, then three invariants keep
//! the dispatch hierarchy flat and acyclic:
//!
//! 1. **No nested subagents** - a subagent's recipe may not itself declare
//!    an `agents` list.
//! 2. **No outbound dispatch inside a subagent** - no source compiled into
//!    a subagent may declare `dispatches:` targets.
//! 3. **Dispatch registration** - every dispatch target declared in the
//!    *parent's* compiled body must appear among the parent's declared
//!    subagent names.
//!
//! All three are fatal and abort the compile with a message naming the
//! exact offender; the first two are [`BraidError::StructuralViolation`],
//! the third [`BraidError::MissingRegistration`] with the precise
//! configuration addition that fixes it.
//!
//! Tool-capability requirements declared on sub-recipes union transitively
//! upward into the dispatching parent's capability set. The recursion is
//! guarded by a visited set passed explicitly through the calls, so recipes
//! shared by multiple subagents are counted once and cycles terminate.

use std::collections::{BTreeSet, HashSet};

use anyhow::Result;

use crate::compiler::{CompiledOutput, Compiler};
use crate::core::BraidError;
use crate::recipe::{Recipe, RecipeLoader, SubagentDecl};
use crate::source::SourceResolver;

/// One generated subagent: the compiled output plus the declaration data
/// carried into the artifact's generated frontmatter.
#[derive(Debug)]
pub struct SubagentArtifact {
    /// Dispatch name the parent's body refers to
    pub name: String,
    /// Model override from the declaration, if any
    pub model: Option<String>,
    /// The subagent recipe's transitive capability set, sorted
    pub capabilities: Vec<String>,
    /// Independently compiled output
    pub output: CompiledOutput,
}

/// Builds subagent artifacts and enforces the structural invariants.
pub struct SubagentBuilder<'a> {
    loader: &'a RecipeLoader,
    resolver: &'a mut SourceResolver,
}

impl<'a> SubagentBuilder<'a> {
    /// Create a builder over a recipe loader and source resolver.
    pub fn new(loader: &'a RecipeLoader, resolver: &'a mut SourceResolver) -> Self {
        Self {
            loader,
            resolver,
        }
    }

    /// Compile every declared subagent of `parent`, validating as it goes.
    ///
    /// Fails on the first structural violation; no artifact is produced for
    /// an offending subagent.
    pub async fn generate(&mut self, parent: &Recipe) -> Result<Vec<SubagentArtifact>> {
        let mut artifacts = Vec::new();

        for decl in &parent.agents {
            let recipe = self.load_leaf_recipe(decl)?;
            tracing::debug!("compiling subagent '{}' from recipe '{}'", decl.name, recipe.name);

            let output = Compiler::new(self.resolver).compile(&recipe).await?;
            self.validate_no_dispatch(decl, &output)?;

            let mut visited = HashSet::new();
            let mut capabilities = BTreeSet::new();
            self.collect_capabilities(&recipe, &mut visited, &mut capabilities);

            artifacts.push(SubagentArtifact {
                name: decl.name.clone(),
                model: decl.model.clone(),
                capabilities: capabilities.into_iter().collect(),
                output,
            });
        }

        Ok(artifacts)
    }

    /// Invariant 1, checkable without compiling: every declared subagent's
    /// recipe must not declare subagents of its own.
    pub fn validate_parent_structure(&self, parent: &Recipe) -> Result<(), BraidError> {
        for decl in &parent.agents {
            self.load_leaf_recipe(decl)?;
        }
        Ok(())
    }

    /// Invariant 3: every dispatch target declared in the parent's compiled
    /// body must be a registered subagent name.
    pub fn validate_registration(
        &self,
        parent: &Recipe,
        output: &CompiledOutput,
    ) -> Result<(), BraidError> {
        let registered: HashSet<&str> =
            parent.agents.iter().map(|decl| decl.name.as_str()).collect();

        for source in &output.body {
            for target in &source.metadata.dispatches {
                if !registered.contains(target.as_str()) {
                    return Err(BraidError::MissingRegistration {
                        file: source.display_name(self.resolver.root()),
                        target: target.clone(),
                        fix: registration_fix(&parent.name, target, &parent.agents),
                    });
                }
            }
        }
        Ok(())
    }

    /// The parent's effective capability set: its own declarations unioned
    /// with every subagent recipe's, transitively.
    pub fn effective_capabilities(&self, parent: &Recipe) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut capabilities = BTreeSet::new();
        self.collect_capabilities(parent, &mut visited, &mut capabilities);
        capabilities.into_iter().collect()
    }

    fn load_leaf_recipe(&self, decl: &SubagentDecl) -> Result<Recipe, BraidError> {
        let recipe = self.loader.load(decl.recipe_name())?;
        if recipe.has_agents() {
            let nested: Vec<&str> = recipe.agents.iter().map(|a| a.name.as_str()).collect();
            return Err(BraidError::StructuralViolation {
                subagent: decl.name.clone(),
                reason: format!(
                    "recipe '{}' declares nested subagents: {}",
                    recipe.name,
                    nested.join(", ")
                ),
            });
        }
        Ok(recipe)
    }

    /// Invariant 2: a compiled subagent must be a leaf in the dispatch
    /// graph. Lists every offending file and target in one message.
    fn validate_no_dispatch(
        &self,
        decl: &SubagentDecl,
        output: &CompiledOutput,
    ) -> Result<(), BraidError> {
        let mut offenders = Vec::new();
        for source in output.iter() {
            if !source.metadata.dispatches.is_empty() {
                offenders.push(format!(
                    "{} -> {}",
                    source.display_name(self.resolver.root()),
                    source.metadata.dispatches.join(", ")
                ));
            }
        }

        if offenders.is_empty() {
            Ok(())
        } else {
            Err(BraidError::StructuralViolation {
                subagent: decl.name.clone(),
                reason: format!("compiled body declares dispatch targets: {}", offenders.join("; ")),
            })
        }
    }

    /// Union capability declarations transitively. `visited` holds recipe
    /// names already counted, so shared sub-recipes and cycles terminate.
    fn collect_capabilities(
        &self,
        recipe: &Recipe,
        visited: &mut HashSet<String>,
        capabilities: &mut BTreeSet<String>,
    ) {
        if !visited.insert(recipe.name.clone()) {
            return;
        }
        capabilities.extend(recipe.capabilities.iter().cloned());

        for decl in &recipe.agents {
            if let Ok(sub) = self.loader.load(decl.recipe_name()) {
                self.collect_capabilities(&sub, visited, capabilities);
            }
        }
    }
}

/// The exact configuration addition that registers a missing target, with a
/// close-name hint when one exists.
fn registration_fix(parent: &str, target: &str, declared: &[SubagentDecl]) -> String {
    let mut fix = format!(
        "Add to recipes/{parent}.toml:\n\n[[agents]]\nname = \"{target}\"\nrecipe = \"{target}\""
    );

    let closest = declared
        .iter()
        .map(|decl| (strsim::jaro_winkler(target, &decl.name), decl.name.as_str()))
        .filter(|(score, _)| *score > 0.85)
        .max_by(|a, b| a.0.total_cmp(&b.0));
    if let Some((_, name)) = closest {
        fix.push_str(&format!("\n\nDid you mean the registered subagent '{name}'?"));
    }

    fix
}

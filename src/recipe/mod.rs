//! Recipe loading, layering, and merging.
//!
//! A recipe is the declarative input to a compile: the root files, remote
//! sources, subagent declarations, and capability requirements for one
//! bundle. Recipes are TOML files named `<name>.toml`, discovered through
//! two layers:
//!
//! 1. **Base layer** - `recipes/` under the compile root, committed with the
//!    corpus.
//! 2. **User override layer** - `~/.config/braid/recipes/`, personal tweaks
//!    that never require editing the base files.
//!
//! When both layers define a recipe, the merged result takes scalar fields
//! from the override and unions list fields (base order first, override-only
//! entries appended). The merge is computed once per load and the result is
//! read-only from then on; nothing holds a recipe as ambient global state.
//!
//! # Recipe format
//!
//! ```toml
//! description = "Context bundle for the demo workflow"
//! files = ["intro.md", "guides/style.md"]
//! capabilities = ["bash"]
//!
//! [[sources]]
//! repo = "acme/handbook"
//! branch = "main"
//! path = "docs/process.md"
//!
//! [[agents]]
//! name = "reviewer"
//! recipe = "reviewer"
//! model = "opus"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::BraidError;

/// A declared external source: one file or tree in a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSource {
    /// Repository in `owner/name` form
    pub repo: String,
    /// Branch to fetch from
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Path within the repository; a trailing `/` marks a tree reference
    /// that expands to every contained markdown document
    pub path: String,
}

fn default_branch() -> String {
    "main".to_string()
}

impl RemoteSource {
    /// Whether this reference names a tree rather than a single blob.
    pub fn is_tree(&self) -> bool {
        self.path.ends_with('/')
    }
}

/// A declared subagent: a named, independently compiled artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubagentDecl {
    /// Name the parent's body dispatches to
    pub name: String,
    /// Recipe to compile for this subagent; defaults to the subagent name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<String>,
    /// Model override carried into the generated artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl SubagentDecl {
    /// The recipe name this subagent compiles from.
    pub fn recipe_name(&self) -> &str {
        self.recipe.as_deref().unwrap_or(&self.name)
    }
}

/// A loaded recipe. Read-only after the layered merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recipe {
    /// Recipe name, taken from the file stem rather than the file contents
    #[serde(skip)]
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Output document name override; defaults to `<name>.md`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Declared root files, resolved through the local search order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    /// Declared remote sources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<RemoteSource>,

    /// Declared subagents
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<SubagentDecl>,

    /// Declared tool-capability requirements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
}

impl Recipe {
    /// Parse a recipe from TOML text.
    pub fn parse(name: &str, file: &Path, text: &str) -> Result<Self, BraidError> {
        let mut recipe: Self = toml::from_str(text).map_err(|e| BraidError::RecipeParseError {
            file: file.display().to_string(),
            reason: e.to_string(),
        })?;
        recipe.name = name.to_string();
        recipe.validate()?;
        Ok(recipe)
    }

    /// The output document file name for this recipe.
    pub fn output_name(&self) -> String {
        self.output.clone().unwrap_or_else(|| format!("{}.md", self.name))
    }

    /// Whether this recipe declares any subagents.
    pub fn has_agents(&self) -> bool {
        !self.agents.is_empty()
    }

    fn validate(&self) -> Result<(), BraidError> {
        let mut seen = std::collections::HashSet::new();
        for agent in &self.agents {
            if agent.name.is_empty() {
                return Err(BraidError::ConfigError {
                    message: format!("recipe '{}' declares a subagent with an empty name", self.name),
                });
            }
            if !seen.insert(agent.name.as_str()) {
                return Err(BraidError::ConfigError {
                    message: format!(
                        "recipe '{}' declares subagent '{}' more than once",
                        self.name, agent.name
                    ),
                });
            }
        }
        Ok(())
    }

    /// Merge a base-layer recipe with a user-override layer.
    ///
    /// Scalar fields: the override wins when set. List fields: union, base
    /// order first, override-only entries appended.
    pub fn merged(base: Self, overlay: Self) -> Self {
        let mut merged = Self {
            name: base.name,
            description: overlay.description.or(base.description),
            output: overlay.output.or(base.output),
            files: base.files,
            sources: base.sources,
            agents: base.agents,
            capabilities: base.capabilities,
        };

        for file in overlay.files {
            if !merged.files.contains(&file) {
                merged.files.push(file);
            }
        }
        for source in overlay.sources {
            if !merged.sources.contains(&source) {
                merged.sources.push(source);
            }
        }
        for agent in overlay.agents {
            // An override redeclaring a subagent name replaces the base entry
            // (its model/recipe fields are scalars of that entry).
            if let Some(existing) = merged.agents.iter_mut().find(|a| a.name == agent.name) {
                *existing = agent;
            } else {
                merged.agents.push(agent);
            }
        }
        for capability in overlay.capabilities {
            if !merged.capabilities.contains(&capability) {
                merged.capabilities.push(capability);
            }
        }

        merged
    }
}

/// Discovers and loads recipes through the base and override layers.
#[derive(Debug, Clone)]
pub struct RecipeLoader {
    base_dir: PathBuf,
    override_dir: Option<PathBuf>,
}

impl RecipeLoader {
    /// Create a loader rooted at the compile root, with the user override
    /// layer at `~/.config/braid/recipes` when that directory exists.
    pub fn new(root: &Path) -> Self {
        let override_dir = dirs::config_dir().map(|dir| dir.join("braid").join("recipes"));
        Self {
            base_dir: root.join("recipes"),
            override_dir: override_dir.filter(|dir| dir.is_dir()),
        }
    }

    /// Create a loader with explicit layer directories.
    pub fn with_dirs(base_dir: PathBuf, override_dir: Option<PathBuf>) -> Self {
        Self {
            base_dir,
            override_dir,
        }
    }

    /// Load a recipe by name, merging the override layer over the base layer.
    ///
    /// A recipe present in only one layer loads from that layer alone.
    pub fn load(&self, name: &str) -> Result<Recipe, BraidError> {
        let base = self.load_layer(&self.base_dir, name)?;
        let overlay = match &self.override_dir {
            Some(dir) => self.load_layer(dir, name)?,
            None => None,
        };

        match (base, overlay) {
            (Some(base), Some(overlay)) => {
                tracing::debug!("recipe '{name}' merged from base and override layers");
                Ok(Recipe::merged(base, overlay))
            }
            (Some(base), None) => Ok(base),
            (None, Some(overlay)) => Ok(overlay),
            (None, None) => Err(BraidError::RecipeNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// List every recipe name discoverable through either layer, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names = std::collections::BTreeSet::new();
        for dir in std::iter::once(&self.base_dir).chain(self.override_dir.iter()) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("toml")
                    && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                {
                    names.insert(stem.to_string());
                }
            }
        }
        names.into_iter().collect()
    }

    fn load_layer(&self, dir: &Path, name: &str) -> Result<Option<Recipe>, BraidError> {
        let path = dir.join(format!("{name}.toml"));
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|e| BraidError::RecipeParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Recipe::parse(name, &path, &text).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_recipe(dir: &Path, name: &str, body: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(format!("{name}.toml")), body).unwrap();
    }

    #[test]
    fn test_parse_full_recipe() {
        let text = r#"
description = "Demo bundle"
files = ["a.md", "b.md"]
capabilities = ["bash"]

[[sources]]
repo = "acme/handbook"
path = "docs/process.md"

[[agents]]
name = "reviewer"
model = "opus"
"#;
        let recipe = Recipe::parse("demo", Path::new("demo.toml"), text).unwrap();
        assert_eq!(recipe.name, "demo");
        assert_eq!(recipe.files, vec!["a.md", "b.md"]);
        assert_eq!(recipe.sources[0].branch, "main");
        assert_eq!(recipe.agents[0].recipe_name(), "reviewer");
        assert_eq!(recipe.output_name(), "demo.md");
    }

    #[test]
    fn test_parse_rejects_duplicate_agents() {
        let text = r#"
[[agents]]
name = "reviewer"
[[agents]]
name = "reviewer"
"#;
        let err = Recipe::parse("demo", Path::new("demo.toml"), text).unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_merge_scalar_override_wins_lists_union() {
        let base = Recipe {
            name: "demo".to_string(),
            description: Some("base".to_string()),
            files: vec!["a.md".to_string(), "b.md".to_string()],
            capabilities: vec!["bash".to_string()],
            ..Default::default()
        };
        let overlay = Recipe {
            description: Some("override".to_string()),
            files: vec!["b.md".to_string(), "c.md".to_string()],
            capabilities: vec!["web".to_string()],
            ..Default::default()
        };

        let merged = Recipe::merged(base, overlay);
        assert_eq!(merged.description.as_deref(), Some("override"));
        assert_eq!(merged.files, vec!["a.md", "b.md", "c.md"]);
        assert_eq!(merged.capabilities, vec!["bash", "web"]);
    }

    #[test]
    fn test_merge_agent_redeclaration_replaces() {
        let base = Recipe {
            name: "demo".to_string(),
            agents: vec![SubagentDecl {
                name: "reviewer".to_string(),
                recipe: None,
                model: None,
            }],
            ..Default::default()
        };
        let overlay = Recipe {
            agents: vec![SubagentDecl {
                name: "reviewer".to_string(),
                recipe: None,
                model: Some("opus".to_string()),
            }],
            ..Default::default()
        };

        let merged = Recipe::merged(base, overlay);
        assert_eq!(merged.agents.len(), 1);
        assert_eq!(merged.agents[0].model.as_deref(), Some("opus"));
    }

    #[test]
    fn test_loader_layering() {
        let base = tempdir().unwrap();
        let over = tempdir().unwrap();
        write_recipe(base.path(), "demo", "files = [\"a.md\"]\ndescription = \"base\"");
        write_recipe(over.path(), "demo", "files = [\"b.md\"]\ndescription = \"mine\"");

        let loader =
            RecipeLoader::with_dirs(base.path().to_path_buf(), Some(over.path().to_path_buf()));
        let recipe = loader.load("demo").unwrap();
        assert_eq!(recipe.description.as_deref(), Some("mine"));
        assert_eq!(recipe.files, vec!["a.md", "b.md"]);
    }

    #[test]
    fn test_loader_missing_recipe() {
        let base = tempdir().unwrap();
        let loader = RecipeLoader::with_dirs(base.path().join("recipes"), None);
        let err = loader.load("ghost").unwrap_err();
        assert!(matches!(err, BraidError::RecipeNotFound { .. }));
    }

    #[test]
    fn test_loader_list_spans_layers() {
        let base = tempdir().unwrap();
        let over = tempdir().unwrap();
        write_recipe(base.path(), "demo", "");
        write_recipe(over.path(), "personal", "");

        let loader =
            RecipeLoader::with_dirs(base.path().to_path_buf(), Some(over.path().to_path_buf()));
        assert_eq!(loader.list(), vec!["demo", "personal"]);
    }

    #[test]
    fn test_tree_reference_detection() {
        let tree = RemoteSource {
            repo: "acme/handbook".to_string(),
            branch: "main".to_string(),
            path: "docs/".to_string(),
        };
        let blob = RemoteSource {
            path: "docs/a.md".to_string(),
            ..tree.clone()
        };
        assert!(tree.is_tree());
        assert!(!blob.is_tree());
    }
}

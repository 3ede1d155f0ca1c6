//! Dependency edge extraction.
//!
//! A resolved source declares its outbound edges in frontmatter: `requires:`
//! for body dependencies and `skills:` for skill attachments. Extraction
//! operates on the metadata parsed from *raw* content - the edges live in
//! the very block that is stripped from published output.
//!
//! Edge resolution preserves provider locality. A relative edge inherits its
//! referencing source's provider: a local file's edge resolves through local
//! resolution, a remote file's edge resolves within the same repository and
//! branch. Providers are never mixed implicitly, so a remote document can
//! never accidentally pull in a same-named local file.
//!
//! Edges come back in declaration order; the compiler's front-insertion
//! turns that order into output order at each traversal level.

use std::path::{Path, PathBuf};

use crate::core::{Category, CanonicalKey, DiscoveryKind, Locator, SourceReference};
use crate::markdown::SourceMetadata;
use crate::utils;

/// A source after resolution: content, identity, and classification.
///
/// One instance exists per unique canonical key per compile. `raw` feeds
/// edge extraction; `body` is the publishable form with metadata stripped.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    /// The reference that resolved to this source
    pub reference: SourceReference,
    /// Deduplication identity, computed once at resolution time
    pub key: CanonicalKey,
    /// Raw content, including the metadata block
    pub raw: String,
    /// Publishable content with the metadata block stripped
    pub body: String,
    /// Parsed frontmatter metadata
    pub metadata: SourceMetadata,
    /// Output category, derived solely from the reference shape
    pub category: Category,
}

impl ResolvedSource {
    /// Display name for warnings and error messages: the declared path,
    /// shortened relative to `root` for local sources when possible.
    pub fn display_name(&self, root: &Path) -> String {
        match &self.reference.locator {
            Locator::Local(_) => {
                let key_path = Path::new(self.key.as_str());
                key_path
                    .strip_prefix(root)
                    .map_or_else(|_| self.key.to_string(), |rel| rel.display().to_string())
            }
            remote => remote.to_string(),
        }
    }
}

/// Extract a source's outbound edges, resolved to concrete references.
///
/// `requires` edges come first, then `skills` edges, each in declaration
/// order. Existence is not checked here; an edge that later fails to
/// resolve is dropped with a warning by the compiler.
pub fn extract_edges(source: &ResolvedSource) -> Vec<SourceReference> {
    let mut edges = Vec::new();
    for spec in &source.metadata.requires {
        edges.push(resolve_edge(source, spec, DiscoveryKind::Requires));
    }
    for spec in &source.metadata.skills {
        edges.push(resolve_edge(source, spec, DiscoveryKind::Skill));
    }
    edges
}

/// Resolve one edge spec against the referencing source's provider.
fn resolve_edge(source: &ResolvedSource, spec: &str, kind: DiscoveryKind) -> SourceReference {
    let recipe = source.reference.recipe.clone();
    match &source.reference.locator {
        Locator::Local(_) => {
            let path = if utils::is_file_relative(spec) {
                // Anchor to the referencing file's directory; the canonical
                // key is the real path of that file.
                let parent = Path::new(source.key.as_str())
                    .parent()
                    .unwrap_or_else(|| Path::new("/"));
                utils::normalize_path(&parent.join(spec))
            } else {
                // Root-relative specs go back through the search order, so
                // overlay shadowing applies to edges too.
                PathBuf::from(spec)
            };
            SourceReference::local(path, recipe, kind)
        }
        Locator::Remote {
            repo,
            branch,
            path,
        } => {
            let target = if utils::is_file_relative(spec) {
                utils::join_logical_path(path, spec)
            } else {
                utils::normalize_logical_path(spec)
            };
            SourceReference::remote(repo.clone(), branch.clone(), target, recipe, kind)
        }
    }
}

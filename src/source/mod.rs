//! Source resolution across the three providers.
//!
//! The resolver turns a [`SourceReference`] into concrete content plus its
//! [`CanonicalKey`], or fails with a recoverable `SourceNotFound`. Three
//! providers participate:
//!
//! - **Local filesystem** with override-shadowing: the compile root is
//!   searched first, then the user overlay directory, then the packaged
//!   defaults directory. First match wins, so a file dropped into the
//!   overlay shadows the packaged default without editing it.
//! - **Remote repositories** via [`remote::RemoteClient`], with one combined
//!   archive request per `repo@branch` group and a per-file fallback.
//! - **Recipe-membership scan** ([`scan`]) contributing implicit roots from
//!   frontmatter `recipes:` declarations.
//!
//! Canonical keys are computed exactly once here, at resolution time: local
//! sources canonicalize their real path, remote sources normalize to
//! `repo@branch:path`.

pub mod remote;
pub mod scan;

use std::path::{Path, PathBuf};

use crate::core::{BraidError, CanonicalKey, Locator, SourceReference};
use crate::recipe::RemoteSource;
use crate::utils;

pub use remote::{RemoteClient, group_by_repo};
pub use scan::scan_memberships;

/// Resolves references to content across the local search path and remote
/// repositories.
pub struct SourceResolver {
    root: PathBuf,
    search_paths: Vec<PathBuf>,
    remote: RemoteClient,
}

impl SourceResolver {
    /// Create a resolver rooted at the compile root.
    ///
    /// The search order is the compile root, then `~/.config/braid/overlay`,
    /// then the packaged defaults directory (`BRAID_DIST` if set, otherwise
    /// `~/.config/braid/dist`) - directories that don't exist are skipped
    /// rather than erroring.
    pub fn new(root: &Path) -> Self {
        let mut search_paths = vec![root.to_path_buf()];
        if let Some(config) = dirs::config_dir() {
            let overlay = config.join("braid").join("overlay");
            if overlay.is_dir() {
                search_paths.push(overlay);
            }
        }
        let dist = std::env::var("BRAID_DIST")
            .map(|dir| utils::expand_tilde(&dir))
            .ok()
            .or_else(|| dirs::config_dir().map(|config| config.join("braid").join("dist")));
        if let Some(dist) = dist.filter(|dir| dir.is_dir()) {
            search_paths.push(dist);
        }

        Self {
            root: canonical_or_given(root.to_path_buf()),
            search_paths,
            remote: RemoteClient::new(),
        }
    }

    /// Create a resolver with an explicit search path, for tests and
    /// embedding. The first entry is treated as the compile root.
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        let root = search_paths.first().cloned().unwrap_or_default();
        Self {
            root: canonical_or_given(root),
            search_paths,
            remote: RemoteClient::new(),
        }
    }

    /// The compile root (first search path).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a reference to `(content, canonical_key)`.
    ///
    /// Fails with [`BraidError::SourceNotFound`] when no provider claims the
    /// reference; callers treat that as recoverable.
    pub async fn resolve(
        &mut self,
        reference: &SourceReference,
    ) -> Result<(String, CanonicalKey), BraidError> {
        match &reference.locator {
            Locator::Local(path) => self.resolve_local(reference, path),
            Locator::Remote {
                repo,
                branch,
                path,
            } => {
                let normalized = utils::normalize_logical_path(path);
                let content = self.remote.fetch(repo, branch, &normalized).await?;
                let key = CanonicalKey::new(format!("{repo}@{branch}:{normalized}"));
                Ok((content, key))
            }
        }
    }

    /// Find a local path through the search order without reading it.
    pub fn locate_local(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf());
        }
        self.search_paths
            .iter()
            .map(|base| base.join(path))
            .find(|candidate| candidate.is_file())
    }

    /// Batch-fetch the declared remote sources before traversal starts.
    pub async fn prefetch(&mut self, sources: &[RemoteSource]) {
        self.remote.prefetch(sources).await;
    }

    /// Expand a remote tree reference to blob references, one listing call.
    pub async fn expand_tree(
        &self,
        source: &RemoteSource,
        recipe: &str,
    ) -> Result<Vec<SourceReference>, BraidError> {
        let files = self.remote.list_tree(&source.repo, &source.branch, &source.path).await?;
        Ok(files
            .into_iter()
            .map(|path| {
                SourceReference::remote(
                    source.repo.clone(),
                    source.branch.clone(),
                    path,
                    recipe,
                    crate::core::DiscoveryKind::Root,
                )
            })
            .collect())
    }

    fn resolve_local(
        &self,
        reference: &SourceReference,
        path: &Path,
    ) -> Result<(String, CanonicalKey), BraidError> {
        let not_found = || BraidError::SourceNotFound {
            reference: reference.to_string(),
        };

        let located = self.locate_local(path).ok_or_else(not_found)?;
        let content = std::fs::read_to_string(&located).map_err(|_| not_found())?;
        // Canonicalize once; the key is compared many times during traversal.
        let canonical = std::fs::canonicalize(&located).map_err(|_| not_found())?;
        Ok((content, CanonicalKey::new(canonical.display().to_string())))
    }
}

/// Keys are canonical paths, so the root must be canonical too for
/// prefix-stripping in display names to line up.
fn canonical_or_given(root: PathBuf) -> PathBuf {
    std::fs::canonicalize(&root).unwrap_or(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DiscoveryKind;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_resolution_and_key() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# A").unwrap();

        let mut resolver = SourceResolver::with_search_paths(vec![dir.path().to_path_buf()]);
        let reference = SourceReference::local("a.md", "demo", DiscoveryKind::Root);
        let (content, key) = resolver.resolve(&reference).await.unwrap();
        assert_eq!(content, "# A");
        assert!(key.as_str().ends_with("a.md"));
    }

    #[tokio::test]
    async fn test_shadowing_first_match_wins() {
        let primary = tempdir().unwrap();
        let fallback = tempdir().unwrap();
        std::fs::write(primary.path().join("a.md"), "primary").unwrap();
        std::fs::write(fallback.path().join("a.md"), "fallback").unwrap();

        let mut resolver = SourceResolver::with_search_paths(vec![
            primary.path().to_path_buf(),
            fallback.path().to_path_buf(),
        ]);
        let reference = SourceReference::local("a.md", "demo", DiscoveryKind::Root);
        let (content, _) = resolver.resolve(&reference).await.unwrap();
        assert_eq!(content, "primary");
    }

    #[tokio::test]
    async fn test_fallback_layer_used_when_missing() {
        let primary = tempdir().unwrap();
        let fallback = tempdir().unwrap();
        std::fs::write(fallback.path().join("only.md"), "fallback").unwrap();

        let mut resolver = SourceResolver::with_search_paths(vec![
            primary.path().to_path_buf(),
            fallback.path().to_path_buf(),
        ]);
        let reference = SourceReference::local("only.md", "demo", DiscoveryKind::Root);
        let (content, _) = resolver.resolve(&reference).await.unwrap();
        assert_eq!(content, "fallback");
    }

    #[tokio::test]
    async fn test_missing_reference_is_not_found() {
        let dir = tempdir().unwrap();
        let mut resolver = SourceResolver::with_search_paths(vec![dir.path().to_path_buf()]);
        let reference = SourceReference::local("ghost.md", "demo", DiscoveryKind::Root);
        let err = resolver.resolve(&reference).await.unwrap_err();
        assert!(matches!(err, BraidError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_same_file_same_key_via_different_specs() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/a.md"), "# A").unwrap();

        let mut resolver = SourceResolver::with_search_paths(vec![dir.path().to_path_buf()]);
        let direct = SourceReference::local("docs/a.md", "demo", DiscoveryKind::Root);
        let dotted = SourceReference::local("docs/../docs/a.md", "demo", DiscoveryKind::Requires);
        let (_, key_a) = resolver.resolve(&direct).await.unwrap();
        let (_, key_b) = resolver.resolve(&dotted).await.unwrap();
        assert_eq!(key_a, key_b);
    }
}

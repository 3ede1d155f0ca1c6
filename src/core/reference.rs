//! Source references, canonical identity, and category classification.
//!
//! A [`SourceReference`] names a document before resolution: where it lives
//! (local search path or a remote repository), which recipe asked for it, and
//! how it was discovered. Resolution turns a reference into content plus a
//! [`CanonicalKey`] - the normalized identity used for deduplication. The
//! [`Category`] of a source is derived solely from the shape of its locator,
//! never from discovery order, so classification is stable across traversals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Where a source lives, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// A path resolved through the local search order (compile root, user
    /// overlay, packaged defaults). Absolute paths skip the search and are
    /// checked directly.
    Local(PathBuf),
    /// A file inside a remote repository at a specific branch.
    Remote {
        /// Repository in `owner/name` form
        repo: String,
        /// Branch name
        branch: String,
        /// Path within the repository
        path: String,
    },
}

impl Locator {
    /// The path portion of the locator, as declared.
    pub fn path_str(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote {
                path, ..
            } => path.clone(),
        }
    }

    /// The bare file name, used when writing side-artifacts to disk.
    pub fn file_name(&self) -> Option<String> {
        match self {
            Self::Local(path) => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            Self::Remote {
                path, ..
            } => path.rsplit('/').next().map(String::from),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote {
                repo,
                branch,
                path,
            } => write!(f, "{repo}@{branch}:{path}"),
        }
    }
}

/// How a reference entered the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryKind {
    /// Declared directly in the recipe's file list or source list
    Root,
    /// Declared through a `requires:` frontmatter edge
    Requires,
    /// Declared through a `skills:` frontmatter edge
    Skill,
    /// Contributed by the recipe-membership scan
    RecipeScan,
}

/// A logical reference to a source document. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceReference {
    /// Where the source lives
    pub locator: Locator,
    /// Name of the recipe whose compile discovered this reference
    pub recipe: String,
    /// How the reference was discovered
    pub kind: DiscoveryKind,
}

impl SourceReference {
    /// Create a local reference.
    pub fn local(path: impl Into<PathBuf>, recipe: impl Into<String>, kind: DiscoveryKind) -> Self {
        Self {
            locator: Locator::Local(path.into()),
            recipe: recipe.into(),
            kind,
        }
    }

    /// Create a remote reference.
    pub fn remote(
        repo: impl Into<String>,
        branch: impl Into<String>,
        path: impl Into<String>,
        recipe: impl Into<String>,
        kind: DiscoveryKind,
    ) -> Self {
        Self {
            locator: Locator::Remote {
                repo: repo.into(),
                branch: branch.into(),
                path: path.into(),
            },
            recipe: recipe.into(),
            kind,
        }
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.locator)
    }
}

/// Normalized, provider-specific identity of a resolved source.
///
/// Local sources use the canonicalized absolute path; remote sources use
/// `repo@branch:path` with the path normalized. Computed once at resolution
/// time, then compared cheaply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// Wrap an already-normalized identity string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four output categories a resolved source can land in.
///
/// Classification is a closed function of the reference shape, computed once
/// per resolved source and carried as data from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Merged into the single output document
    Body,
    /// Extracted as a standalone command file
    Command,
    /// A self-contained skill bundle, compiled independently
    Skill,
    /// An executable script, copied byte-for-byte
    Script,
}

impl Category {
    /// Classify a locator by the collection point its path passes through.
    ///
    /// A `commands/` segment marks a command file, a `skills/` segment a
    /// skill bundle, a `bin/` segment an executable script. Everything else
    /// is body content.
    pub fn classify(locator: &Locator) -> Self {
        let has_segment = |segment: &str| match locator {
            Locator::Local(path) => path_has_segment(path, segment),
            Locator::Remote {
                path, ..
            } => path.split('/').any(|part| part == segment),
        };

        if has_segment("commands") {
            Self::Command
        } else if has_segment("skills") {
            Self::Skill
        } else if has_segment("bin") {
            Self::Script
        } else {
            Self::Body
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Body => "body",
            Self::Command => "command",
            Self::Skill => "skill",
            Self::Script => "script",
        };
        write!(f, "{name}")
    }
}

fn path_has_segment(path: &Path, segment: &str) -> bool {
    path.components().any(|component| match component {
        Component::Normal(part) => part.to_str() == Some(segment),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_local_paths() {
        let body = Locator::Local(PathBuf::from("guides/style.md"));
        let command = Locator::Local(PathBuf::from("commands/deploy.md"));
        let skill = Locator::Local(PathBuf::from("skills/review/SKILL.md"));
        let script = Locator::Local(PathBuf::from("bin/setup.sh"));

        assert_eq!(Category::classify(&body), Category::Body);
        assert_eq!(Category::classify(&command), Category::Command);
        assert_eq!(Category::classify(&skill), Category::Skill);
        assert_eq!(Category::classify(&script), Category::Script);
    }

    #[test]
    fn test_classify_remote_paths() {
        let command = Locator::Remote {
            repo: "org/repo".to_string(),
            branch: "main".to_string(),
            path: "docs/commands/release.md".to_string(),
        };
        assert_eq!(Category::classify(&command), Category::Command);
    }

    #[test]
    fn test_classify_does_not_match_partial_segments() {
        // "commandset" is not a "commands" collection point
        let body = Locator::Local(PathBuf::from("commandset/notes.md"));
        assert_eq!(Category::classify(&body), Category::Body);
    }

    #[test]
    fn test_remote_display() {
        let reference = SourceReference::remote(
            "org/repo",
            "main",
            "docs/a.md",
            "demo",
            DiscoveryKind::Root,
        );
        assert_eq!(reference.to_string(), "org/repo@main:docs/a.md");
    }
}

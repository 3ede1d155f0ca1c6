//! Recipe-membership scan.
//!
//! Documents can opt into a recipe from the inside: a frontmatter
//! `recipes: [name]` declaration makes the file an implicit root of that
//! recipe's compile, with no edit to the recipe file itself. The scan walks
//! the full local corpus under the compile root, in sorted order so the
//! contributed roots are deterministic.

use std::path::Path;

use walkdir::WalkDir;

use crate::core::{DiscoveryKind, SourceReference};
use crate::markdown;

/// Walk the corpus and collect references whose frontmatter declares
/// membership in `recipe`.
///
/// Hidden directories and non-markdown files are skipped. Unreadable files
/// are dropped with a debug log; the scan itself never fails.
pub fn scan_memberships(root: &Path, recipe: &str) -> Vec<SourceReference> {
    let mut references = Vec::new();

    let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|entry| {
        !entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
    });

    for entry in walker.flatten() {
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some("md")
        {
            continue;
        }

        let Ok(raw) = std::fs::read_to_string(path) else {
            tracing::debug!("membership scan skipping unreadable {}", path.display());
            continue;
        };

        let (metadata, _) = markdown::split_with_context(&raw, path.to_str());
        if metadata.recipes.iter().any(|name| name == recipe) {
            tracing::debug!("membership scan matched {}", path.display());
            references.push(SourceReference::local(path, recipe, DiscoveryKind::RecipeScan));
        }
    }

    references
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scan_finds_members_in_sorted_order() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("guides")).unwrap();
        std::fs::write(
            dir.path().join("zeta.md"),
            "---\nrecipes:\n  - demo\n---\nzeta",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("guides/alpha.md"),
            "---\nrecipes:\n  - demo\n  - other\n---\nalpha",
        )
        .unwrap();
        std::fs::write(dir.path().join("plain.md"), "no frontmatter").unwrap();

        let refs = scan_memberships(dir.path(), "demo");
        assert_eq!(refs.len(), 2);
        assert!(refs[0].locator.path_str().ends_with("alpha.md"));
        assert!(refs[1].locator.path_str().ends_with("zeta.md"));
        assert!(refs.iter().all(|r| r.kind == DiscoveryKind::RecipeScan));
    }

    #[test]
    fn test_scan_ignores_other_recipes_and_hidden_dirs() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        std::fs::write(
            dir.path().join(".hidden/member.md"),
            "---\nrecipes:\n  - demo\n---\nhidden",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("other.md"),
            "---\nrecipes:\n  - different\n---\nother",
        )
        .unwrap();

        assert!(scan_memberships(dir.path(), "demo").is_empty());
    }
}

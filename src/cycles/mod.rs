//! Diagnostic cycle detection over the whole corpus.
//!
//! Compilation never needs this - the visited-set skip makes cyclic graphs
//! compile safely - but a cycle in the corpus is usually an authoring
//! accident worth surfacing. The detector builds an adjacency map over
//! every local markdown document under the corpus root, runs a DFS with an
//! explicit recursion stack, and reports each distinct cycle once,
//! regardless of which node the scan entered it from.
//!
//! Raw cycles are normalized by rotating to start at the lexicographically
//! smallest key and deduplicated by normalized sequence. The report is
//! advisory only and never blocks any operation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use anyhow::Result;
use walkdir::WalkDir;

use crate::core::{CanonicalKey, Category, DiscoveryKind, Locator, SourceReference};
use crate::markdown;
use crate::resolver::{self, ResolvedSource};
use crate::utils;

/// One dependency cycle, as corpus-relative document keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cycle(pub Vec<String>);

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.0.join(" -> "), self.0[0])
    }
}

/// DFS node states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not yet visited
    White,
    /// On the explicit recursion stack
    Gray,
    /// Fully explored
    Black,
}

/// Scan the corpus under `root` and report every distinct dependency cycle.
pub fn detect_cycles(root: &Path) -> Result<Vec<Cycle>> {
    let adjacency = build_adjacency(root);
    let mut colors: HashMap<String, Color> =
        adjacency.keys().map(|key| (key.clone(), Color::White)).collect();
    let mut normalized: BTreeSet<Vec<String>> = BTreeSet::new();

    for start in adjacency.keys() {
        if colors[start] != Color::White {
            continue;
        }
        dfs_from(start, &adjacency, &mut colors, &mut normalized);
    }

    Ok(normalized.into_iter().map(Cycle).collect())
}

/// Adjacency map of corpus-relative key -> edge targets, for every local
/// markdown document. Edges are extracted exactly as the compiler extracts
/// them; targets outside the corpus are ignored.
fn build_adjacency(root: &Path) -> BTreeMap<String, Vec<String>> {
    let mut adjacency: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let canonical_root = match std::fs::canonicalize(root) {
        Ok(canonical) => canonical,
        Err(_) => return adjacency,
    };

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
        let Ok(canonical) = std::fs::canonicalize(path) else {
            continue;
        };
        let Some(key) = relative_key(&canonical_root, &canonical) else {
            continue;
        };
        let Ok(raw) = std::fs::read_to_string(path) else {
            continue;
        };

        let (metadata, body) = markdown::split_with_context(&raw, Some(key.as_str()));
        let source = ResolvedSource {
            reference: SourceReference::local(&canonical, "diagnostics", DiscoveryKind::Root),
            key: CanonicalKey::new(canonical.display().to_string()),
            raw,
            body,
            metadata,
            category: Category::classify(&Locator::Local(canonical.clone())),
        };

        let targets = resolver::extract_edges(&source)
            .into_iter()
            .filter_map(|edge| edge_target_key(&canonical_root, &edge))
            .collect();
        adjacency.insert(key, targets);
    }

    // Keep only edges whose target is itself part of the corpus.
    let known: BTreeSet<String> = adjacency.keys().cloned().collect();
    for targets in adjacency.values_mut() {
        targets.retain(|target| known.contains(target));
    }

    adjacency
}

/// Map an extracted edge back to a corpus-relative key.
fn edge_target_key(canonical_root: &Path, edge: &SourceReference) -> Option<String> {
    match &edge.locator {
        Locator::Local(path) if path.is_absolute() => relative_key(canonical_root, path),
        Locator::Local(path) => Some(utils::normalize_logical_path(&path.display().to_string())),
        Locator::Remote {
            ..
        } => None,
    }
}

fn relative_key(canonical_root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(canonical_root).ok()?;
    Some(relative.display().to_string().replace('\\', "/"))
}

/// Depth-first search with an explicit stack. Revisiting a gray node emits
/// the current path slice from that node's first occurrence as a raw cycle.
fn dfs_from(
    start: &str,
    adjacency: &BTreeMap<String, Vec<String>>,
    colors: &mut HashMap<String, Color>,
    normalized: &mut BTreeSet<Vec<String>>,
) {
    // (node, index of the next edge to explore)
    let mut stack: Vec<(String, usize)> = vec![(start.to_string(), 0)];
    let mut path: Vec<String> = Vec::new();
    let mut on_path: HashMap<String, usize> = HashMap::new();

    while let Some((node, edge_index)) = stack.last().cloned() {
        if edge_index == 0 {
            colors.insert(node.clone(), Color::Gray);
            on_path.insert(node.clone(), path.len());
            path.push(node.clone());
        }

        let edges = adjacency.get(&node).map(Vec::as_slice).unwrap_or_default();
        if edge_index < edges.len() {
            stack.last_mut().expect("stack is non-empty").1 += 1;
            let target = &edges[edge_index];

            if let Some(&first) = on_path.get(target) {
                normalized.insert(normalize_rotation(&path[first..]));
            } else if colors.get(target) == Some(&Color::White) {
                stack.push((target.clone(), 0));
            }
        } else {
            colors.insert(node.clone(), Color::Black);
            on_path.remove(&node);
            path.pop();
            stack.pop();
        }
    }
}

/// Rotate a raw cycle to start at its lexicographically smallest key.
fn normalize_rotation(raw: &[String]) -> Vec<String> {
    let mut cycle = raw.to_vec();
    if let Some(smallest) = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(index, _)| index)
    {
        cycle.rotate_left(smallest);
    }
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    fn corpus(files: &[(&str, &str)]) -> TempDir {
        let dir = tempdir().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(full, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_two_node_cycle() {
        let dir = corpus(&[
            ("a.md", "---\nrequires:\n  - b.md\n---\nA"),
            ("b.md", "---\nrequires:\n  - a.md\n---\nB"),
        ]);
        let cycles = detect_cycles(dir.path()).unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].0, vec!["a.md", "b.md"]);
    }

    #[test]
    fn test_three_node_cycle_reported_once() {
        // A -> B -> C -> A: one cycle regardless of scan entry point.
        let dir = corpus(&[
            ("a.md", "---\nrequires:\n  - b.md\n---\nA"),
            ("b.md", "---\nrequires:\n  - c.md\n---\nB"),
            ("c.md", "---\nrequires:\n  - a.md\n---\nC"),
        ]);
        let cycles = detect_cycles(dir.path()).unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].0, vec!["a.md", "b.md", "c.md"]);
    }

    #[test]
    fn test_acyclic_corpus_is_clean() {
        let dir = corpus(&[
            ("a.md", "---\nrequires:\n  - b.md\n---\nA"),
            ("b.md", "B"),
        ]);
        assert!(detect_cycles(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_self_loop() {
        let dir = corpus(&[("a.md", "---\nrequires:\n  - a.md\n---\nA")]);
        let cycles = detect_cycles(dir.path()).unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].0, vec!["a.md"]);
    }

    #[test]
    fn test_two_distinct_cycles() {
        let dir = corpus(&[
            ("a.md", "---\nrequires:\n  - b.md\n---\nA"),
            ("b.md", "---\nrequires:\n  - a.md\n---\nB"),
            ("x.md", "---\nrequires:\n  - y.md\n---\nX"),
            ("y.md", "---\nrequires:\n  - x.md\n---\nY"),
        ]);
        let cycles = detect_cycles(dir.path()).unwrap();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].0, vec!["a.md", "b.md"]);
        assert_eq!(cycles[1].0, vec!["x.md", "y.md"]);
    }

    #[test]
    fn test_file_relative_edges_participate() {
        let dir = corpus(&[
            ("guides/a.md", "---\nrequires:\n  - ./b.md\n---\nA"),
            ("guides/b.md", "---\nrequires:\n  - ../guides/a.md\n---\nB"),
        ]);
        let cycles = detect_cycles(dir.path()).unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].0, vec!["guides/a.md", "guides/b.md"]);
    }

    #[test]
    fn test_edges_to_missing_files_ignored() {
        let dir = corpus(&[("a.md", "---\nrequires:\n  - ghost.md\n---\nA")]);
        assert!(detect_cycles(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_display_closes_the_loop() {
        let cycle = Cycle(vec!["a.md".to_string(), "b.md".to_string()]);
        assert_eq!(cycle.to_string(), "a.md -> b.md -> a.md");
    }
}

//! Cross-cutting path utilities.
//!
//! Local identities are canonicalized filesystem paths; remote identities are
//! logical `repo@branch:path` strings whose path portion is normalized
//! lexically (no filesystem involved). Both normalizations happen exactly
//! once, at resolution time.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a logical path: resolve `.` and `..` segments and
/// collapse separators, without touching the filesystem.
///
/// `..` segments that would climb above the root are dropped.
pub fn normalize_logical_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    parts.join("/")
}

/// Join a relative spec onto the directory containing `base`, then normalize.
///
/// `base` is a logical file path; the join starts from its parent directory.
pub fn join_logical_path(base: &str, relative: &str) -> String {
    let dir = match base.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    };
    if dir.is_empty() {
        normalize_logical_path(relative)
    } else {
        normalize_logical_path(&format!("{dir}/{relative}"))
    }
}

/// Whether a path spec is file-relative (`./` or `../`) as opposed to
/// root-relative.
pub fn is_file_relative(spec: &str) -> bool {
    spec.starts_with("./") || spec.starts_with("../")
}

/// Lexically normalize a filesystem path without requiring it to exist.
///
/// Used for display and for pre-canonicalization joins; real identity still
/// comes from `std::fs::canonicalize` at resolution time.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            other => result.push(other),
        }
    }
    result
}

/// Expand a leading tilde in a configured path.
pub fn expand_tilde(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

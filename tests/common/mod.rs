//! Shared helpers for the integration test suite.

use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

/// Build a corpus directory from `(relative path, content)` pairs.
pub fn corpus(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    for (path, content) in files {
        write_file(dir.path(), path, content);
    }
    dir
}

/// Write one file under `root`, creating parent directories as needed.
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let full = root.join(relative);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).expect("failed to create parent dirs");
    }
    std::fs::write(full, content).expect("failed to write file");
}

/// A `braid` invocation rooted at the given corpus.
pub fn braid(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("braid").expect("braid binary builds");
    cmd.arg("--root").arg(root);
    cmd
}

/// Read a produced artifact back from the default output directory.
pub fn read_output(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join("build").join(relative))
        .unwrap_or_else(|e| panic!("missing output artifact {relative}: {e}"))
}

//! Advisory cycle report integration tests.

use predicates::prelude::*;

use super::common::{braid, corpus};

#[test]
fn cycle_report_names_the_loop_once() {
    let dir = corpus(&[
        ("a.md", "---\nrequires:\n  - b.md\n---\nA"),
        ("b.md", "---\nrequires:\n  - c.md\n---\nB"),
        ("c.md", "---\nrequires:\n  - a.md\n---\nC"),
    ]);

    braid(dir.path())
        .arg("cycles")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("1 dependency cycle(s)")
                .and(predicate::str::contains("a.md -> b.md -> c.md -> a.md")),
        );
}

#[test]
fn cycle_report_clean_corpus() {
    let dir = corpus(&[("a.md", "---\nrequires:\n  - b.md\n---\nA"), ("b.md", "B")]);

    braid(dir.path())
        .arg("cycles")
        .assert()
        .success()
        .stdout(predicate::str::contains("no dependency cycles found"));
}

#[test]
fn cycle_report_never_blocks_compiles() {
    // The same cyclic corpus still compiles: the report is advisory only.
    let dir = corpus(&[
        ("recipes/demo.toml", "files = [\"a.md\"]\n"),
        ("a.md", "---\nrequires:\n  - b.md\n---\nA"),
        ("b.md", "---\nrequires:\n  - a.md\n---\nB"),
    ]);

    braid(dir.path()).arg("cycles").assert().success();
    braid(dir.path()).args(["compile", "demo"]).assert().success();
}

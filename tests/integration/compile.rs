//! Compile pipeline integration tests.

use predicates::prelude::*;

use super::common::{braid, corpus, read_output};

#[test]
fn compile_cyclic_pair_emits_each_once_dependency_first() {
    let dir = corpus(&[
        ("recipes/demo.toml", "files = [\"a.md\"]\n"),
        ("a.md", "---\nrequires:\n  - b.md\n---\nA body"),
        ("b.md", "---\nrequires:\n  - a.md\n---\nB body"),
    ]);

    braid(dir.path()).args(["compile", "demo"]).assert().success();

    let document = read_output(dir.path(), "demo.md");
    assert_eq!(document, "B body\n\nA body\n");
}

#[test]
fn compile_is_idempotent() {
    let dir = corpus(&[
        ("recipes/demo.toml", "files = [\"a.md\"]\n"),
        ("a.md", "---\nrequires:\n  - b.md\n---\nA"),
        ("b.md", "B"),
    ]);

    braid(dir.path()).args(["compile", "demo"]).assert().success();
    let first = read_output(dir.path(), "demo.md");
    braid(dir.path()).args(["compile", "demo"]).assert().success();
    let second = read_output(dir.path(), "demo.md");
    assert_eq!(first, second);
}

#[test]
fn compile_writes_categorized_artifacts() {
    let dir = corpus(&[
        ("recipes/demo.toml", "files = [\"main.md\"]\n"),
        (
            "main.md",
            "---\nrequires:\n  - commands/deploy.md\n  - bin/setup.sh\nskills:\n  - skills/review.md\n---\nMain",
        ),
        ("commands/deploy.md", "---\ndescription: deploy\n---\nRun the deploy"),
        ("skills/review.md", "---\nrequires:\n  - checklist.md\n---\nReview skill"),
        ("checklist.md", "The checklist"),
        ("bin/setup.sh", "#!/bin/sh\necho setup\n"),
    ]);

    braid(dir.path()).args(["compile", "demo"]).assert().success();

    assert_eq!(read_output(dir.path(), "demo.md"), "Main\n");
    assert_eq!(read_output(dir.path(), "commands/deploy.md"), "Run the deploy");
    // Skill bundle: nested compile folded the dependency in, ahead of the
    // skill's own content.
    assert_eq!(read_output(dir.path(), "skills/review.md"), "The checklist\n\nReview skill\n");
    // Script copied byte-for-byte.
    assert_eq!(read_output(dir.path(), "bin/setup.sh"), "#!/bin/sh\necho setup\n");
}

#[test]
fn compile_missing_reference_warns_but_succeeds() {
    let dir = corpus(&[
        ("recipes/demo.toml", "files = [\"a.md\"]\n"),
        ("a.md", "---\nrequires:\n  - ghost.md\n---\nA"),
    ]);

    braid(dir.path())
        .args(["compile", "demo"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning"));

    assert_eq!(read_output(dir.path(), "demo.md"), "A\n");
}

#[test]
fn compile_unknown_recipe_fails_with_hint() {
    let dir = corpus(&[]);

    braid(dir.path())
        .args(["compile", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Recipe 'ghost' not found"));
}

#[test]
fn compile_missing_registration_is_fatal_and_names_fix() {
    let dir = corpus(&[
        ("recipes/demo.toml", "files = [\"main.md\"]\n"),
        ("main.md", "---\ndispatches:\n  - reviewer\n---\nMain"),
    ]);

    braid(dir.path())
        .args(["compile", "demo"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("reviewer")
                .and(predicate::str::contains("[[agents]]")),
        );

    assert!(!dir.path().join("build/demo.md").exists());
}

#[test]
fn compile_membership_scan_contributes_roots() {
    let dir = corpus(&[
        ("recipes/demo.toml", "files = [\"a.md\"]\n"),
        ("a.md", "A"),
        ("extra.md", "---\nrecipes:\n  - demo\n---\nExtra"),
    ]);

    braid(dir.path()).args(["compile", "demo"]).assert().success();
    assert_eq!(read_output(dir.path(), "demo.md"), "A\n\nExtra\n");
}

#[test]
fn compile_dry_run_writes_nothing() {
    let dir = corpus(&[
        ("recipes/demo.toml", "files = [\"a.md\"]\n"),
        ("a.md", "A"),
    ]);

    braid(dir.path())
        .args(["compile", "demo", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 sections"));
    assert!(!dir.path().join("build").exists());
}

#[test]
fn compile_list_shows_recipes() {
    let dir = corpus(&[
        ("recipes/demo.toml", "description = \"Demo bundle\"\n"),
        ("recipes/other.toml", ""),
    ]);

    braid(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo").and(predicate::str::contains("other")));
}

#[test]
fn compile_malformed_recipe_fails_with_parse_error() {
    let dir = corpus(&[("recipes/demo.toml", "files = [unclosed\n")]);

    braid(dir.path())
        .args(["compile", "demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid recipe file syntax"));
}

#[test]
fn compile_malformed_frontmatter_degrades_gracefully() {
    let dir = corpus(&[
        ("recipes/demo.toml", "files = [\"a.md\"]\n"),
        ("a.md", "---\nrequires: [unclosed\n---\nStill published"),
    ]);

    braid(dir.path())
        .args(["compile", "demo"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning"));
    assert_eq!(read_output(dir.path(), "demo.md"), "Still published\n");
}

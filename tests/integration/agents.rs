//! Subagent generation integration tests.

use predicates::prelude::*;

use super::common::{braid, corpus, read_output, write_file};

#[test]
fn agents_generates_artifact_with_frontmatter() {
    let dir = corpus(&[
        (
            "recipes/parent.toml",
            "files = [\"main.md\"]\n\n[[agents]]\nname = \"helper\"\nmodel = \"opus\"\n",
        ),
        ("recipes/helper.toml", "files = [\"helper.md\"]\ncapabilities = [\"bash\"]\n"),
        ("main.md", "Main"),
        ("helper.md", "Helper body"),
    ]);

    braid(dir.path())
        .args(["agents", "parent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("helper"));

    let artifact = read_output(dir.path(), "agents/helper.md");
    assert!(artifact.starts_with("---\n"));
    assert!(artifact.contains("name: helper"));
    assert!(artifact.contains("model: opus"));
    assert!(artifact.contains("- bash"));
    assert!(artifact.ends_with("Helper body\n"));
}

#[test]
fn agents_nested_subagents_rejected_and_no_artifact_written() {
    let dir = corpus(&[
        ("recipes/parent.toml", "[[agents]]\nname = \"mid\"\n"),
        ("recipes/mid.toml", "[[agents]]\nname = \"deep\"\n"),
        ("recipes/deep.toml", ""),
    ]);

    braid(dir.path())
        .args(["agents", "parent"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("Structural violation")
                .and(predicate::str::contains("mid"))
                .and(predicate::str::contains("deep")),
        );

    assert!(!dir.path().join("build/agents/mid.md").exists());
}

#[test]
fn agents_dispatch_inside_subagent_rejected() {
    let dir = corpus(&[
        ("recipes/parent.toml", "[[agents]]\nname = \"helper\"\n"),
        ("recipes/helper.toml", "files = [\"helper.md\"]\n"),
        ("helper.md", "---\ndispatches:\n  - somewhere\n---\nH"),
    ]);

    braid(dir.path())
        .args(["agents", "parent"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("helper").and(predicate::str::contains("somewhere")),
        );
}

#[test]
fn agents_none_declared_is_a_no_op() {
    let dir = corpus(&[("recipes/solo.toml", "files = [\"a.md\"]\n"), ("a.md", "A")]);

    braid(dir.path())
        .args(["agents", "solo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("declares no subagents"));
}

#[test]
fn agents_dispatch_name_can_differ_from_recipe_name() {
    let dir = corpus(&[
        ("recipes/parent.toml", "[[agents]]\nname = \"helper\"\nrecipe = \"impl\"\n"),
        ("recipes/impl.toml", "files = [\"impl.md\"]\n"),
    ]);
    write_file(dir.path(), "impl.md", "Implementation");

    braid(dir.path()).args(["agents", "parent"]).assert().success();
    assert!(read_output(dir.path(), "agents/helper.md").contains("Implementation"));
}

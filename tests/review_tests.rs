use predicates::prelude::*;
use tempfile::TempDir;
mod common;
use common::*;

#[test]
fn test_review_before_any_commits_reports_no_changes() {
    let temp = TempDir::new().unwrap();
    init_workspace(temp.path());

    dw6(temp.path())
        .arg("review")
        .assert()
        .success()
        .stdout(predicate::str::contains("first commit"))
        .stdout(predicate::str::contains("No changes."));
}

#[test]
fn test_review_shows_diff_since_baseline() {
    let temp = TempDir::new().unwrap();
    init_workspace(temp.path());
    commit_file(temp.path(), "src/lib.rs", "pub fn added() {}\n", "add function");

    dw6(temp.path())
        .arg("review")
        .assert()
        .success()
        .stdout(predicate::str::contains("Comparing"))
        .stdout(predicate::str::contains("src/lib.rs"))
        .stdout(predicate::str::contains("+pub fn added() {}"));
}

#[test]
fn test_review_path_filter() {
    let temp = TempDir::new().unwrap();
    init_workspace(temp.path());
    commit_file(temp.path(), "src/lib.rs", "pub fn added() {}\n", "add function");
    commit_file(temp.path(), "notes/plan.md", "a plan\n", "add plan");

    dw6(temp.path())
        .args(["review", "--path", "notes/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("notes/plan.md"))
        .stdout(predicate::str::contains("src/lib.rs").not());
}

#[test]
fn test_review_uses_recorded_baseline_after_coder_approval() {
    let temp = TempDir::new().unwrap();
    init_workspace(temp.path());
    advance_to_coder(temp.path());
    commit_file(temp.path(), "src/lib.rs", "pub fn work() {}\n", "implement work");
    dw6(temp.path()).arg("approve").assert().success();

    // Changes before the approval are no longer part of the review range.
    commit_file(temp.path(), "src/extra.rs", "pub fn extra() {}\n", "add extra");

    dw6(temp.path())
        .arg("review")
        .assert()
        .success()
        .stdout(predicate::str::contains("src/extra.rs"))
        .stdout(predicate::str::contains("first commit").not());
}

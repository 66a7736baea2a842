use predicates::prelude::*;
use tempfile::TempDir;
mod common;
use common::*;

#[test]
fn test_commit_uses_requirement_message() {
    let temp = TempDir::new().unwrap();
    init_workspace(temp.path());
    write_file(temp.path(), "src/lib.rs", "pub fn work() {}\n");

    dw6(temp.path())
        .arg("commit")
        .assert()
        .success()
        .stdout(predicate::str::contains("feat(req-1)"));

    let subject = git_stdout(temp.path(), &["log", "-1", "--format=%s"]);
    assert_eq!(subject, "feat(req-1): Coder stage submission for requirement 1");
}

#[test]
fn test_commit_with_clean_tree_does_nothing() {
    let temp = TempDir::new().unwrap();
    init_workspace(temp.path());

    dw6(temp.path())
        .arg("commit")
        .assert()
        .success()
        .stdout(predicate::str::contains("No new commit created"));
}

#[test]
fn test_commit_deliverable_uses_cycle_message() {
    let temp = TempDir::new().unwrap();
    init_workspace(temp.path());
    write_file(temp.path(), "deliverables/engineering/design.md", "design\n");

    dw6(temp.path())
        .args(["commit", "--deliverable", "deliverables/engineering/design.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("docs(cycle-1)"));

    let subject = git_stdout(temp.path(), &["log", "-1", "--format=%s"]);
    assert_eq!(subject, "docs(cycle-1): Add engineer deliverable for cycle 1");

    // Only the deliverable was committed.
    let files = git_stdout(temp.path(), &["show", "--name-only", "--format="]);
    assert_eq!(files.trim(), "deliverables/engineering/design.md");
}

#[test]
fn test_commit_push_without_remote_fails() {
    let temp = TempDir::new().unwrap();
    init_workspace(temp.path());
    write_file(temp.path(), "src/lib.rs", "pub fn work() {}\n");

    dw6(temp.path())
        .args(["commit", "--push"])
        .env_remove("GITHUB_REPO_URL")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No push URL configured"));
}

#[test]
fn test_commit_push_to_local_remote() {
    let temp = TempDir::new().unwrap();
    init_workspace(temp.path());

    let remote = TempDir::new().unwrap();
    git(remote.path(), &["init", "--bare"]);
    git(temp.path(), &["remote", "add", "origin", remote.path().to_str().unwrap()]);

    write_file(temp.path(), "src/lib.rs", "pub fn work() {}\n");

    dw6(temp.path())
        .args(["commit", "--push"])
        .env_remove("GITHUB_REPO_URL")
        .env_remove("GITHUB_TOKEN")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pushed"));

    let remote_log = git_stdout(remote.path(), &["log", "--oneline"]);
    assert!(remote_log.contains("feat(req-1)"));
}

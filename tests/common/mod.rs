#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::Path;

/// Identity and isolation env vars so git works inside the temp dirs
/// regardless of the host configuration.
const GIT_ENV: &[(&str, &str)] = &[
    ("GIT_AUTHOR_NAME", "DW6 Tester"),
    ("GIT_AUTHOR_EMAIL", "tester@example.com"),
    ("GIT_COMMITTER_NAME", "DW6 Tester"),
    ("GIT_COMMITTER_EMAIL", "tester@example.com"),
    ("GIT_CONFIG_NOSYSTEM", "1"),
];

/// A `dw6` command running in `dir`.
pub fn dw6(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dw6").unwrap();
    cmd.current_dir(dir);
    cmd.env("HOME", dir);
    for (key, value) in GIT_ENV {
        cmd.env(key, value);
    }
    cmd
}

/// Run a git command in `dir`, asserting success.
pub fn git(dir: &Path, args: &[&str]) {
    let mut cmd = std::process::Command::new("git");
    cmd.current_dir(dir).args(args).env("HOME", dir);
    for (key, value) in GIT_ENV {
        cmd.env(key, value);
    }
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Capture a git command's stdout in `dir`.
pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let mut cmd = std::process::Command::new("git");
    cmd.current_dir(dir).args(args).env("HOME", dir);
    for (key, value) in GIT_ENV {
        cmd.env(key, value);
    }
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Scaffold a workspace with `dw6 init` (state files, deliverable dirs,
/// git repository with an initial commit).
pub fn init_workspace(dir: &Path) {
    dw6(dir).arg("init").assert().success();
}

/// Write `content` to `path` (relative to `dir`), creating parents.
pub fn write_file(dir: &Path, path: &str, content: &str) {
    let full = dir.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, content).unwrap();
}

/// Write a file and commit it.
pub fn commit_file(dir: &Path, path: &str, content: &str, message: &str) {
    write_file(dir, path, content);
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-m", message]);
}

/// Drop a deliverable file into a stage's deliverable directory.
pub fn add_deliverable(dir: &Path, stage_dir: &str) {
    write_file(dir, &format!("{}/notes.md", stage_dir), "deliverable\n");
}

/// Read a value out of the workflow master document.
pub fn state_value(dir: &Path, key: &str) -> Option<String> {
    let content = fs::read_to_string(dir.join("docs/WORKFLOW_MASTER.md")).unwrap();
    for line in content.lines() {
        let line = line.trim().trim_start_matches("- ");
        if let Some((k, v)) = line.split_once(':') {
            if k.trim() == key {
                let value = v.split('#').next().unwrap_or("").trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Append a `Key: value` entry to the workflow master document.
pub fn set_state(dir: &Path, key: &str, value: &str) {
    let path = dir.join("docs/WORKFLOW_MASTER.md");
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str(&format!("{}: {}\n", key, value));
    fs::write(path, content).unwrap();
}

/// Advance an initialized workspace from Engineer to Coder by satisfying
/// the first two stage gates.
pub fn advance_to_coder(dir: &Path) {
    add_deliverable(dir, "deliverables/engineering");
    dw6(dir).arg("approve").assert().success();
    add_deliverable(dir, "deliverables/research");
    dw6(dir).arg("approve").assert().success();
    assert_eq!(state_value(dir, "CurrentStage").unwrap(), "Coder");
}

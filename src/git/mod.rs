//! Git plumbing via the system `git` binary.
//!
//! dw6 treats git as evidence storage: gates inspect commits, diffs, and
//! tags but never touch the object database directly. Every call shells out
//! to `git` in the project root and surfaces git's stderr in the error chain.

pub mod remote;

use serde::Serialize;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("failed to run 'git {command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'git {command}' failed: {stderr}")]
    Failed { command: String, stderr: String },
}

pub type Result<T> = std::result::Result<T, GitError>;

/// Run git with `args` in `root` and return trimmed stdout.
fn run_git(root: &Path, args: &[&str]) -> Result<String> {
    log::debug!("running git {}", args.join(" "));
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map_err(|source| GitError::Spawn {
            command: args.join(" "),
            source,
        })?;

    if !output.status.success() {
        return Err(GitError::Failed {
            command: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether `root` is inside a git work tree.
pub fn is_work_tree(root: &Path) -> bool {
    run_git(root, &["rev-parse", "--is-inside-work-tree"])
        .map(|out| out == "true")
        .unwrap_or(false)
}

/// Whether the working directory is clean (no staged or unstaged changes).
pub fn is_clean(root: &Path) -> Result<bool> {
    Ok(run_git(root, &["status", "--porcelain"])?.is_empty())
}

/// SHA of the current HEAD commit.
pub fn head_sha(root: &Path) -> Result<String> {
    run_git(root, &["rev-parse", "HEAD"])
}

/// SHA of the repository's first (root) commit.
pub fn root_commit_sha(root: &Path) -> Result<String> {
    let out = run_git(root, &["rev-list", "--max-parents=0", "HEAD"])?;
    // A history grafted from multiple roots lists one sha per line; the
    // last line is the oldest.
    Ok(out.lines().last().unwrap_or_default().to_string())
}

/// Name of the currently checked-out branch.
pub fn current_branch(root: &Path) -> Result<String> {
    run_git(root, &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// Diff between two commits, optionally restricted to a path prefix.
pub fn diff(root: &Path, from: &str, to: &str, path: Option<&str>) -> Result<String> {
    let mut args = vec!["diff", from, to];
    if let Some(path) = path {
        args.push("--");
        args.push(path);
    }
    run_git(root, &args)
}

/// Files changed between two commits.
pub fn changed_files(root: &Path, from: &str, to: &str) -> Result<Vec<String>> {
    let out = run_git(root, &["diff", "--name-only", from, to])?;
    Ok(out.lines().map(str::to_string).collect())
}

/// Change statistics between two commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

/// Statistics for the changes between two commits, parsed from
/// `git diff --shortstat`.
pub fn diff_stats(root: &Path, from: &str, to: &str) -> Result<DiffStats> {
    if from == to {
        return Ok(DiffStats::default());
    }
    let out = run_git(root, &["diff", "--shortstat", from, to])?;
    Ok(parse_shortstat(&out))
}

/// Parse a `--shortstat` line such as
/// ` 3 files changed, 10 insertions(+), 2 deletions(-)`.
fn parse_shortstat(line: &str) -> DiffStats {
    let mut stats = DiffStats::default();
    for part in line.trim().split(", ") {
        let count = part
            .split_whitespace()
            .next()
            .and_then(|n| n.parse::<u32>().ok())
            .unwrap_or(0);
        if part.contains("file") {
            stats.files_changed = count;
        } else if part.contains("insertion") {
            stats.insertions = count;
        } else if part.contains("deletion") {
            stats.deletions = count;
        }
    }
    stats
}

/// Tags on the `origin` remote, mapped to the commits they point at.
///
/// Annotated tags appear in `ls-remote` output twice, once for the tag
/// object and once as a peeled `^{}` ref pointing at the commit; the peeled
/// sha wins.
pub fn remote_tags(root: &Path) -> Result<Vec<(String, String)>> {
    let out = run_git(root, &["ls-remote", "--tags", "origin"])?;
    Ok(parse_ls_remote_tags(&out))
}

fn parse_ls_remote_tags(out: &str) -> Vec<(String, String)> {
    let mut tags: Vec<(String, String)> = Vec::new();
    for line in out.lines() {
        let Some((sha, ref_name)) = line.split_once('\t') else {
            continue;
        };
        let Some(tag) = ref_name.strip_prefix("refs/tags/") else {
            continue;
        };
        if let Some(tag) = tag.strip_suffix("^{}") {
            // Peeled ref: replace the tag-object sha recorded earlier.
            match tags.iter_mut().find(|(name, _)| name == tag) {
                Some(entry) => entry.1 = sha.to_string(),
                None => tags.push((tag.to_string(), sha.to_string())),
            }
        } else if !tags.iter().any(|(name, _)| name == tag) {
            tags.push((tag.to_string(), sha.to_string()));
        }
    }
    tags
}

/// Local tags pointing at `sha`.
pub fn local_tags_at(root: &Path, sha: &str) -> Result<Vec<String>> {
    let out = run_git(root, &["tag", "--points-at", sha])?;
    Ok(out.lines().map(str::to_string).filter(|t| !t.is_empty()).collect())
}

/// Stage all changes in the work tree.
pub fn stage_all(root: &Path) -> Result<()> {
    run_git(root, &["add", "-A"]).map(|_| ())
}

/// Stage a single path.
pub fn stage_path(root: &Path, path: &str) -> Result<()> {
    run_git(root, &["add", "--", path]).map(|_| ())
}

/// Whether anything is staged for commit.
pub fn has_staged_changes(root: &Path) -> Result<bool> {
    // `diff --staged --quiet` exits 1 when the index differs from HEAD.
    let status = Command::new("git")
        .args(["diff", "--staged", "--quiet"])
        .current_dir(root)
        .status()
        .map_err(|source| GitError::Spawn {
            command: "diff --staged --quiet".to_string(),
            source,
        })?;
    Ok(!status.success())
}

/// Create a commit with `message` from the current index.
pub fn commit(root: &Path, message: &str) -> Result<()> {
    run_git(root, &["commit", "-m", message]).map(|_| ())
}

/// Push `branch` to `url`. The URL may carry credentials; error output is
/// redacted through `sanitize` before it can reach the user.
pub fn push(root: &Path, url: &str, branch: &str, sanitize: &dyn Fn(&str) -> String) -> Result<()> {
    match run_git(root, &["push", url, branch]) {
        Ok(_) => Ok(()),
        Err(GitError::Failed { command, stderr }) => Err(GitError::Failed {
            command: sanitize(&command),
            stderr: sanitize(&stderr),
        }),
        Err(e) => Err(e),
    }
}

/// Value of a git configuration key, or `None` when unset.
pub fn config_get(root: &Path, key: &str) -> Option<String> {
    run_git(root, &["config", "--get", key])
        .ok()
        .filter(|v| !v.is_empty())
}

/// Initialize a repository in `root` with an initial commit, if none exists.
pub fn init_repo(root: &Path) -> Result<bool> {
    if root.join(".git").exists() {
        return Ok(false);
    }
    run_git(root, &["init"])?;
    stage_all(root)?;
    run_git(root, &["commit", "--allow-empty", "-m", "Initial commit: project setup"])?;
    Ok(true)
}

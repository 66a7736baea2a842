//! Stage approval: gates, transitions, and the requirement cycle.

use crate::config;
use crate::git::{self, DiffStats};
use crate::models::Stage;
use crate::state::StateFile;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result of a successful `approve`.
#[derive(Debug)]
pub struct ApprovalOutcome {
    pub approved: Stage,
    pub next: Stage,
    /// Requirement id completed, when the approval closed a full cycle.
    pub completed_requirement: Option<u32>,
}

/// Diff range the Coder gate and `review` operate on.
#[derive(Debug)]
pub struct ReviewReport {
    pub from: String,
    pub to: String,
    /// True when no approved baseline existed and the repository's first
    /// commit was used instead.
    pub from_root: bool,
    pub diff: String,
}

/// Orchestrates the workflow: loads state, checks gates, advances stages.
pub struct WorkflowManager {
    root: PathBuf,
    state: StateFile,
    stage: Stage,
}

impl WorkflowManager {
    /// Load the workflow for the project at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let state = StateFile::load(&root.join(config::MASTER_FILE))?;
        let stage: Stage = state
            .require("CurrentStage")?
            .parse()
            .map_err(anyhow::Error::msg)?;
        Ok(Self { root: root.to_path_buf(), state, stage })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn state(&self) -> &StateFile {
        &self.state
    }

    /// Validate the current stage's gates and advance the workflow.
    pub fn approve(&mut self) -> Result<ApprovalOutcome> {
        let stage = self.stage;

        if stage == Stage::Coder {
            let path = self.generate_coder_deliverable()?;
            log::info!("wrote coder deliverable to {}", path.display());
        }

        self.validate_stage()
            .with_context(|| format!("Stage {} not approved", stage))?;

        let mut completed_requirement = None;
        if stage.is_last() {
            completed_requirement = Some(self.complete_requirement_cycle()?);
        }

        let next = stage.next();
        self.state.set("CurrentStage", next);

        if stage == Stage::Coder {
            let head = git::head_sha(&self.root)?;
            self.state.set("LastCommitSHA", &head);
            log::info!("recorded approved commit {}", head);
        }

        self.state.save()?;
        self.stage = next;

        Ok(ApprovalOutcome { approved: stage, next, completed_requirement })
    }

    /// Diff since the last approved commit, optionally limited to a path
    /// prefix.
    pub fn review(&self, path: Option<&str>) -> Result<ReviewReport> {
        let (from, from_root) = self.baseline_sha()?;
        let to = git::head_sha(&self.root)?;
        let diff = git::diff(&self.root, &from, &to, path)?;
        Ok(ReviewReport { from, to, from_root, diff })
    }

    /// Change statistics since the last approved commit, when a baseline
    /// can be established.
    pub fn change_stats(&self) -> Option<DiffStats> {
        let (from, _) = self.baseline_sha().ok()?;
        let to = git::head_sha(&self.root).ok()?;
        git::diff_stats(&self.root, &from, &to).ok()
    }

    /// The commit gates diff against: `LastCommitSHA` when recorded,
    /// otherwise the repository's first commit.
    fn baseline_sha(&self) -> Result<(String, bool)> {
        match self.state.get("LastCommitSHA") {
            Some(sha) => Ok((sha.to_string(), false)),
            None => Ok((git::root_commit_sha(&self.root)?, true)),
        }
    }

    fn validate_stage(&self) -> Result<()> {
        let dir = self.root.join(self.stage.deliverable_dir());
        if !dir_has_deliverables(&dir) {
            bail!(
                "No deliverables found in {} for stage {}",
                self.stage.deliverable_dir(),
                self.stage
            );
        }

        match self.stage {
            Stage::Coder => self.validate_coder(),
            Stage::Validator => self.validate_validator(),
            Stage::Deployer => self.validate_deployer(),
            _ => Ok(()),
        }
    }

    fn validate_coder(&self) -> Result<()> {
        let (baseline, _) = self.baseline_sha()?;
        let head = git::head_sha(&self.root)?;
        if baseline == head {
            bail!("No new commits since the last approved commit ({})", &baseline[..7.min(baseline.len())]);
        }
        let diff = git::diff(&self.root, &baseline, &head, Some("src/"))?;
        if diff.trim().is_empty() {
            bail!("No code changes detected under 'src/' since {}", &baseline[..7.min(baseline.len())]);
        }
        Ok(())
    }

    fn validate_validator(&self) -> Result<()> {
        let tests_dir = self.root.join("tests");
        if !dir_has_deliverables(&tests_dir) {
            bail!("No tests found in the 'tests' directory");
        }

        let command_line = self
            .state
            .get("TestCommand")
            .unwrap_or(config::DEFAULT_TEST_COMMAND)
            .to_string();
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .context("TestCommand in the state file is empty")?;

        log::info!("running test command: {}", command_line);
        let output = std::process::Command::new(program)
            .args(parts)
            .current_dir(&self.root)
            .output()
            .with_context(|| format!("Failed to run test command '{}'", command_line))?;

        if !output.status.success() {
            bail!(
                "Test command '{}' failed:\n{}{}",
                command_line,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }

    fn validate_deployer(&self) -> Result<()> {
        let head = git::head_sha(&self.root)?;

        match git::remote_tags(&self.root) {
            Ok(tags) => {
                let matching: Vec<&str> = tags
                    .iter()
                    .filter(|(_, sha)| *sha == head)
                    .map(|(name, _)| name.as_str())
                    .collect();
                if !matching.is_empty() {
                    log::info!("HEAD is tagged on origin: {}", matching.join(", "));
                    return Ok(());
                }
                // Tags exist remotely but none point at HEAD; a local tag
                // that simply has not been pushed yet still fails the gate.
                if !tags.is_empty() {
                    bail!(
                        "The latest commit ({}) has not been tagged and pushed to origin",
                        &head[..7]
                    );
                }
            }
            Err(e) => log::warn!("could not query remote tags, checking local tags: {}", e),
        }

        let local = git::local_tags_at(&self.root, &head)?;
        if local.is_empty() {
            bail!(
                "The latest commit ({}) has not been tagged. \
                 Tag it first, e.g. 'git tag -a v1.0 -m \"Release 1.0\"'.",
                &head[..7]
            );
        }
        log::info!("HEAD is tagged locally: {}", local.join(", "));
        Ok(())
    }

    /// Write `deliverables/coding/coder_deliverable.md`: the changed-file
    /// list and full diff since the last approved commit.
    fn generate_coder_deliverable(&self) -> Result<PathBuf> {
        let (from, _) = self.baseline_sha()?;
        let to = git::head_sha(&self.root)?;
        let files = git::changed_files(&self.root, &from, &to)?;
        let diff = git::diff(&self.root, &from, &to, None)?;

        let mut report = String::from("# Coder Deliverable\n\n");
        report.push_str("## Changed Files\n\n");
        for file in &files {
            report.push_str(&format!("- `{}`\n", file));
        }
        report.push_str("\n## Diff\n\n```diff\n");
        report.push_str(&diff);
        report.push_str("\n```\n");

        let dir = self.root.join(Stage::Coder.deliverable_dir());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join("coder_deliverable.md");
        std::fs::write(&path, report)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Log the approval, tick the requirement checkbox, and advance the
    /// requirement pointer and cycle counter.
    fn complete_requirement_cycle(&mut self) -> Result<u32> {
        let req_id: u32 = self
            .state
            .require("RequirementPointer")?
            .parse()
            .context("RequirementPointer in the state file is not a number")?;

        let log_path = self.root.join(config::APPROVAL_LOG);
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let mut log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open {}", log_path.display()))?;
        writeln!(log_file, "Requirement {} approved at {}", req_id, timestamp)
            .with_context(|| format!("Failed to write {}", log_path.display()))?;

        let req_path = self.root.join(config::REQUIREMENTS_FILE);
        if let Ok(content) = std::fs::read_to_string(&req_path) {
            if let Some(updated) = tick_requirement(&content, req_id) {
                std::fs::write(&req_path, updated)
                    .with_context(|| format!("Failed to write {}", req_path.display()))?;
                log::info!("ticked requirement {} in {}", req_id, config::REQUIREMENTS_FILE);
            }
        }

        self.state.set("RequirementPointer", req_id + 1);
        let cycle: u32 = self
            .state
            .get("Cycle")
            .and_then(|c| c.parse().ok())
            .unwrap_or(1);
        self.state.set("Cycle", cycle + 1);

        Ok(req_id)
    }
}

/// Whether `dir` contains at least one real deliverable. `.gitkeep` and
/// other dotfiles don't count.
fn dir_has_deliverables(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .filter_map(|e| e.ok())
        .any(|e| !e.file_name().to_string_lossy().starts_with('.'))
}

/// Flip the first unchecked checkbox on the `ID <n>` line, if present.
/// Returns the rewritten document, or `None` when nothing matched.
fn tick_requirement(content: &str, req_id: u32) -> Option<String> {
    let needle = format!("ID {}", req_id);
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let target = lines.iter().position(|line| {
        let Some(pos) = line.find(&needle) else {
            return false;
        };
        // `ID 1` must not match the `ID 12` line.
        let id_ends = !line[pos + needle.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());
        id_ends && line.contains("[ ]")
    })?;
    let ticked = lines[target].replacen("[ ]", "[x]", 1);
    lines[target] = ticked;
    Some(lines.join("\n") + "\n")
}

//! Environment verification for the `dw6 doctor` command.
//!
//! Checks that the workspace can actually run the workflow: git on PATH, a
//! repository, the state file, and the pieces pushing needs. Required checks
//! fail the command; credential checks only warn, since a workspace without
//! a remote is still usable.

use crate::config::{self, EnvFile};
use crate::git;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<Check>,
}

impl DoctorReport {
    /// True when no required check failed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Fail)
    }
}

/// Run every environment check for the project at `root`.
pub fn run_checks(root: &Path, env: &EnvFile) -> DoctorReport {
    let mut checks = Vec::new();

    let git_found = match which::which("git") {
        Ok(path) => {
            checks.push(Check {
                name: "git binary",
                status: CheckStatus::Pass,
                detail: path.display().to_string(),
            });
            true
        }
        Err(_) => {
            checks.push(Check {
                name: "git binary",
                status: CheckStatus::Fail,
                detail: "git not found on PATH".to_string(),
            });
            false
        }
    };

    let in_repo = git_found && git::is_work_tree(root);
    checks.push(Check {
        name: "git repository",
        status: if in_repo { CheckStatus::Pass } else { CheckStatus::Fail },
        detail: if in_repo {
            "inside a work tree".to_string()
        } else {
            "not a git repository (run 'dw6 init')".to_string()
        },
    });

    let state_exists = root.join(config::MASTER_FILE).exists();
    checks.push(Check {
        name: "workflow state",
        status: if state_exists { CheckStatus::Pass } else { CheckStatus::Fail },
        detail: if state_exists {
            config::MASTER_FILE.to_string()
        } else {
            format!("{} missing (run 'dw6 init')", config::MASTER_FILE)
        },
    });

    if in_repo {
        match git::is_clean(root) {
            Ok(true) => checks.push(Check {
                name: "working tree",
                status: CheckStatus::Pass,
                detail: "clean".to_string(),
            }),
            Ok(false) => checks.push(Check {
                name: "working tree",
                status: CheckStatus::Warn,
                detail: "uncommitted changes present".to_string(),
            }),
            Err(e) => checks.push(Check {
                name: "working tree",
                status: CheckStatus::Warn,
                detail: e.to_string(),
            }),
        }

        let origin = git::config_get(root, "remote.origin.url");
        checks.push(match origin {
            Some(url) => Check {
                name: "remote origin",
                status: CheckStatus::Pass,
                detail: url,
            },
            None => Check {
                name: "remote origin",
                status: CheckStatus::Warn,
                detail: "no [remote \"origin\"] url configured".to_string(),
            },
        });

        let push_url = crate::git::remote::resolve_push_url(root, env);
        checks.push(match push_url {
            Some(url) => Check {
                name: "push url",
                status: CheckStatus::Pass,
                detail: url,
            },
            None => Check {
                name: "push url",
                status: CheckStatus::Warn,
                detail: "set GITHUB_REPO_URL in .env or configure remote 'origin'".to_string(),
            },
        });
    }

    // Reported as present/absent only; the value itself is never shown.
    let token = env.github_token();
    checks.push(Check {
        name: "github token",
        status: if token.is_some() { CheckStatus::Pass } else { CheckStatus::Warn },
        detail: if token.is_some() {
            "GITHUB_TOKEN present".to_string()
        } else {
            "GITHUB_TOKEN not set (pushes will use your ambient git credentials)".to_string()
        },
    });

    DoctorReport { checks }
}

/// Render the report as text.
pub fn format_report(report: &DoctorReport) -> String {
    let mut out = String::new();
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok  ",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "FAIL",
        };
        out.push_str(&format!("[{}] {:<16} {}\n", marker, check.name, check.detail));
    }
    out
}

use crate::cli::doctor;
use crate::cli::error::user_error;
use crate::cli::output;
use crate::config::{self, EnvFile};
use crate::git;
use crate::models::Stage;
use crate::state::WorkflowManager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;

#[derive(Parser)]
#[command(name = "dw6")]
#[command(about = "DW6 - staged development workflow gatekeeper for git projects")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scaffold the workflow files and git repository in the current directory
    Init,
    /// Show the workflow dashboard
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show the diff since the last approved commit
    Review {
        /// Limit the diff to a path prefix (e.g. src/)
        #[arg(long)]
        path: Option<String>,
    },
    /// Validate the current stage's gates and advance the workflow
    Approve,
    /// Commit work with a standardized message
    Commit {
        /// Commit a single deliverable file instead of all changes
        #[arg(long)]
        deliverable: Option<String>,
        /// Push the current branch after committing
        #[arg(long)]
        push: bool,
    },
    /// Verify the environment (git, repository, remote, credentials)
    Doctor {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print()?;
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let root = std::env::current_dir().context("Failed to determine current directory")?;
    handle_command(cli, &root)
}

fn handle_command(cli: Cli, root: &Path) -> Result<()> {
    match cli.command {
        Commands::Init => handle_init(root),
        Commands::Status { json } => handle_status(root, json),
        Commands::Review { path } => handle_review(root, path.as_deref()),
        Commands::Approve => handle_approve(root),
        Commands::Commit { deliverable, push } => handle_commit(root, deliverable.as_deref(), push),
        Commands::Doctor { json } => handle_doctor(root, json),
    }
}

/// Load the workflow manager, or exit with a user error pointing at `init`.
fn load_manager(root: &Path) -> WorkflowManager {
    match WorkflowManager::load(root) {
        Ok(manager) => manager,
        Err(e) => user_error(&format!("{:#}", e)),
    }
}

const MASTER_TEMPLATE: &str = "\
# DW6 Workflow Master

- CurrentStage: Engineer
- RequirementPointer: 1
- Cycle: 1
";

const REQUIREMENTS_TEMPLATE: &str = "\
# Project Requirements

- [ ] ID 1: Describe the first requirement.
";

fn handle_init(root: &Path) -> Result<()> {
    let master = root.join(config::MASTER_FILE);
    if master.exists() {
        user_error(&format!(
            "Workflow already initialized: {} exists",
            config::MASTER_FILE
        ));
    }

    let docs = master.parent().context("Master file path has no parent")?;
    std::fs::create_dir_all(docs)
        .with_context(|| format!("Failed to create {}", docs.display()))?;
    std::fs::write(&master, MASTER_TEMPLATE)
        .with_context(|| format!("Failed to write {}", master.display()))?;
    println!("Created {}", config::MASTER_FILE);

    let requirements = root.join(config::REQUIREMENTS_FILE);
    if !requirements.exists() {
        std::fs::write(&requirements, REQUIREMENTS_TEMPLATE)
            .with_context(|| format!("Failed to write {}", requirements.display()))?;
        println!("Created {}", config::REQUIREMENTS_FILE);
    }

    for stage in Stage::ALL {
        let dir = root.join(stage.deliverable_dir());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        std::fs::write(dir.join(".gitkeep"), "")?;
    }
    std::fs::create_dir_all(root.join("logs"))?;
    println!("Created deliverable directories");

    match git::init_repo(root) {
        Ok(true) => println!("Initialized git repository with an initial commit"),
        Ok(false) => println!("Using existing git repository"),
        Err(e) => user_error(&e.to_string()),
    }

    println!("Workflow ready. Current stage: {}", Stage::Engineer);
    Ok(())
}

fn handle_status(root: &Path, json: bool) -> Result<()> {
    let manager = load_manager(root);
    let stage = manager.stage();
    let entries = manager.state().entries();
    let stats = manager.change_stats();
    let clean = git::is_clean(root).ok();

    if json {
        let state: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        let json_status = serde_json::json!({
            "stage": stage,
            "state": state,
            "changes_since_last_approval": stats,
            "working_tree_clean": clean,
        });
        println!("{}", serde_json::to_string_pretty(&json_status)?);
    } else {
        println!(
            "{}",
            output::format_status(&entries, stage, stats.as_ref(), clean)
        );
    }
    Ok(())
}

fn handle_review(root: &Path, path: Option<&str>) -> Result<()> {
    let manager = load_manager(root);
    let report = match manager.review(path) {
        Ok(report) => report,
        Err(e) => user_error(&format!("{:#}", e)),
    };

    println!(
        "{}",
        output::format_review_header(manager.stage(), &report.from, &report.to, report.from_root)
    );
    if report.diff.trim().is_empty() {
        println!("No changes.");
    } else {
        println!("{}", report.diff);
    }
    Ok(())
}

fn handle_approve(root: &Path) -> Result<()> {
    let mut manager = load_manager(root);
    println!("Approving stage: {}", manager.stage());

    let outcome = match manager.approve() {
        Ok(outcome) => outcome,
        Err(e) => user_error(&format!("{:#}", e)),
    };

    if let Some(req_id) = outcome.completed_requirement {
        println!(
            "Requirement {} completed; advanced to requirement {}.",
            req_id,
            req_id + 1
        );
    }
    println!(
        "Stage {} approved. Moved to {} stage.",
        outcome.approved, outcome.next
    );
    Ok(())
}

fn handle_commit(root: &Path, deliverable: Option<&str>, push: bool) -> Result<()> {
    let manager = load_manager(root);
    let env = EnvFile::load(root);

    let message = match deliverable {
        Some(path) => {
            let cycle = manager.state().get("Cycle").unwrap_or("1").to_string();
            if let Err(e) = git::stage_path(root, path) {
                user_error(&e.to_string());
            }
            format!(
                "docs(cycle-{}): Add {} deliverable for cycle {}",
                cycle,
                manager.stage().as_str().to_lowercase(),
                cycle
            )
        }
        None => {
            let req_id = match manager.state().require("RequirementPointer") {
                Ok(id) => id.to_string(),
                Err(e) => user_error(&format!("{:#}", e)),
            };
            if let Err(e) = git::stage_all(root) {
                user_error(&e.to_string());
            }
            format!(
                "feat(req-{}): Coder stage submission for requirement {}",
                req_id, req_id
            )
        }
    };

    match git::has_staged_changes(root) {
        Ok(true) => {
            if let Err(e) = git::commit(root, &message) {
                user_error(&e.to_string());
            }
            println!("Committed: {}", message);
        }
        Ok(false) => println!("Working tree is clean. No new commit created."),
        Err(e) => user_error(&e.to_string()),
    }

    if push {
        push_current_branch(root, &env);
    }
    Ok(())
}

/// Push the current branch to the configured remote, authenticating with
/// `GITHUB_TOKEN` when available.
fn push_current_branch(root: &Path, env: &EnvFile) {
    let Some(repo_url) = git::remote::resolve_push_url(root, env) else {
        user_error("No push URL configured. Set GITHUB_REPO_URL in .env or configure remote 'origin'.");
    };

    let branch = match git::current_branch(root) {
        Ok(branch) if branch != "HEAD" => branch,
        _ => user_error("Could not determine the current git branch."),
    };

    let token = env.github_token().unwrap_or_default();
    let push_url = if token.is_empty() {
        repo_url.clone()
    } else {
        git::remote::authenticated_url(&repo_url, &token)
    };

    let sanitize = |text: &str| git::remote::redact(text, &token);
    match git::push(root, &push_url, &branch, &sanitize) {
        Ok(()) => println!("Pushed {} to {}.", branch, sanitize(&repo_url)),
        Err(e) => {
            let message = e.to_string();
            if message.contains("Authentication failed") {
                user_error("Push failed due to an authentication error. Check your GITHUB_TOKEN.");
            }
            user_error(&message);
        }
    }
}

fn handle_doctor(root: &Path, json: bool) -> Result<()> {
    let env = EnvFile::load(root);
    let report = doctor::run_checks(root, &env);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", doctor::format_report(&report));
    }

    if !report.passed() {
        user_error("Environment checks failed.");
    }
    Ok(())
}

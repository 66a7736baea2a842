//! Well-known workspace paths and `.env` handling.
//!
//! Everything dw6 touches lives relative to the project root: the workflow
//! master document, the requirements checklist, the approval log, and the
//! per-stage deliverable directories. Credentials come from the process
//! environment, backed by an optional `.env` file in the project root.

use std::collections::HashMap;
use std::path::Path;

/// Workflow state document, owned by dw6.
pub const MASTER_FILE: &str = "docs/WORKFLOW_MASTER.md";

/// Requirements checklist; dw6 only flips checkboxes in it.
pub const REQUIREMENTS_FILE: &str = "docs/PROJECT_REQUIREMENTS.md";

/// Append-only approval log.
pub const APPROVAL_LOG: &str = "logs/approvals.log";

/// Optional credentials file in the project root.
pub const ENV_FILE: &str = ".env";

/// Command run by the Validator gate when the state file sets no `TestCommand`.
pub const DEFAULT_TEST_COMMAND: &str = "cargo test";

/// Key/value pairs loaded from a `.env` file.
///
/// Process environment variables always take precedence over file values, so
/// a `.env` entry can never shadow something the user exported themselves.
#[derive(Debug, Default)]
pub struct EnvFile {
    vars: HashMap<String, String>,
}

impl EnvFile {
    /// Load `.env` from the project root. A missing file is not an error;
    /// it simply yields an empty set of fallback values.
    pub fn load(root: &Path) -> Self {
        let path = root.join(ENV_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parse `KEY=VALUE` lines. Blank lines and `#` comment lines are
    /// skipped, `export ` prefixes are tolerated, and matching single or
    /// double quotes around the value are stripped.
    pub fn parse(content: &str) -> Self {
        let mut vars = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            vars.insert(key.to_string(), unquote(value.trim()).to_string());
        }
        Self { vars }
    }

    /// Look up a key, preferring the process environment over the file.
    pub fn get(&self, key: &str) -> Option<String> {
        match std::env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => self.vars.get(key).cloned().filter(|v| !v.is_empty()),
        }
    }

    /// The GitHub token used to authenticate pushes, if configured.
    pub fn github_token(&self) -> Option<String> {
        self.get("GITHUB_TOKEN")
    }

    /// Explicit push URL override, if configured.
    pub fn github_repo_url(&self) -> Option<String> {
        self.get("GITHUB_REPO_URL")
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

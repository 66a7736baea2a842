//! The workflow master document.
//!
//! Workflow state is kept in a human-editable markdown file
//! (`docs/WORKFLOW_MASTER.md`). Any line of the form `Key: value` (with an
//! optional leading `- ` bullet and an optional trailing `# comment`) is a
//! state entry; every other line is prose and is preserved verbatim across
//! rewrites. Updates edit the matching line in place so bullets, comments,
//! and surrounding text survive a round trip through dw6.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// In-memory view of the workflow master document.
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
    lines: Vec<String>,
    data: HashMap<String, String>,
}

impl StateFile {
    /// Load the document at `path`. Missing file is an error: the workspace
    /// has to be scaffolded with `dw6 init` first.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Workflow state file not found at {} (run 'dw6 init' to create it)",
                path.display()
            )
        })?;
        Ok(Self::from_content(path.to_path_buf(), &content))
    }

    fn from_content(path: PathBuf, content: &str) -> Self {
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        let mut data = HashMap::new();
        for line in &lines {
            if let Some((key, value)) = parse_entry(line) {
                data.insert(key.to_string(), value.to_string());
            }
        }
        Self { path, lines, data }
    }

    /// Value for `key`, if the document defines it non-empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Value for `key`, or an error naming the missing key.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .with_context(|| format!("State file {} has no '{}' entry", self.path.display(), key))
    }

    /// Set `key` to `value`, editing the existing `Key:` line in place when
    /// there is one (keeping its bullet and trailing comment) and appending
    /// a new line otherwise.
    pub fn set(&mut self, key: &str, value: impl Display) {
        let value = value.to_string();
        self.data.insert(key.to_string(), value.clone());

        for line in &mut self.lines {
            if let Some(rewritten) = rewrite_entry_line(line, key, &value) {
                *line = rewritten;
                return;
            }
        }
        self.lines.push(format!("{}: {}", key, value));
    }

    /// Parsed entries in document order, for display.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.lines
            .iter()
            .filter_map(|line| parse_entry(line))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Write the document back to disk.
    pub fn save(&self) -> Result<()> {
        let content = self.lines.join("\n") + "\n";
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write state file {}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Rewrite `line` as `key: value` when it is the entry for `key`, keeping
/// its bullet and trailing comment. Returns `None` for any other line.
fn rewrite_entry_line(line: &str, key: &str, value: &str) -> Option<String> {
    let (bullet, rest) = split_bullet(line);
    let (line_key, _) = rest.split_once(':')?;
    if line_key.trim() != key {
        return None;
    }
    let comment = line
        .split_once('#')
        .map(|(_, c)| format!(" # {}", c.trim()))
        .unwrap_or_default();
    Some(format!("{}{}: {}{}", bullet, key, value, comment))
}

/// Split an optional leading markdown bullet off a line.
fn split_bullet(line: &str) -> (&str, &str) {
    let trimmed_len = line.len() - line.trim_start().len();
    let (indent, rest) = line.split_at(trimmed_len);
    if let Some(stripped) = rest.strip_prefix("- ") {
        (&line[..indent.len() + 2], stripped)
    } else {
        (indent, rest)
    }
}

/// Parse a `Key: value` entry out of a line, stripping the bullet and any
/// trailing `#` comment. Returns `None` for prose lines.
fn parse_entry(line: &str) -> Option<(&str, &str)> {
    let (_, rest) = split_bullet(line);
    let (key, value) = rest.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.starts_with('#') {
        return None;
    }
    let value = value.split('#').next().unwrap_or("").trim();
    Some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# DW6 Workflow Master

- CurrentStage: Coder
- RequirementPointer: 3 # next up: persistence layer
Cycle: 2

Some free-form notes that must survive.
";

    fn state(content: &str) -> StateFile {
        StateFile::from_content(PathBuf::from("WORKFLOW_MASTER.md"), content)
    }

    #[test]
    fn test_parse_bulleted_and_plain_entries() {
        let s = state(DOC);
        assert_eq!(s.get("CurrentStage"), Some("Coder"));
        assert_eq!(s.get("Cycle"), Some("2"));
    }

    #[test]
    fn test_trailing_comment_excluded_from_value() {
        let s = state(DOC);
        assert_eq!(s.get("RequirementPointer"), Some("3"));
    }

    #[test]
    fn test_headings_are_not_entries() {
        let s = state(DOC);
        assert!(s.get("# DW6 Workflow Master").is_none());
        assert!(s.entries().iter().all(|(k, _)| !k.starts_with('#')));
    }

    #[test]
    fn test_set_preserves_bullet_and_comment() {
        let mut s = state(DOC);
        s.set("RequirementPointer", 4);
        let line = s
            .lines
            .iter()
            .find(|l| l.contains("RequirementPointer"))
            .unwrap();
        assert_eq!(line, "- RequirementPointer: 4 # next up: persistence layer");
        assert_eq!(s.get("RequirementPointer"), Some("4"));
    }

    #[test]
    fn test_set_unknown_key_appends() {
        let mut s = state(DOC);
        s.set("LastCommitSHA", "abc123");
        assert_eq!(s.lines.last().unwrap(), "LastCommitSHA: abc123");
        assert_eq!(s.get("LastCommitSHA"), Some("abc123"));
    }

    #[test]
    fn test_prose_survives_set() {
        let mut s = state(DOC);
        s.set("CurrentStage", "Validator");
        let content = s.lines.join("\n");
        assert!(content.contains("Some free-form notes that must survive."));
        assert!(content.contains("# DW6 Workflow Master"));
    }

    #[test]
    fn test_entries_in_document_order() {
        let s = state(DOC);
        let keys: Vec<_> = s.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["CurrentStage", "RequirementPointer", "Cycle"]);
    }

    #[test]
    fn test_require_names_missing_key() {
        let s = state(DOC);
        let err = s.require("LastCommitSHA").unwrap_err();
        assert!(err.to_string().contains("LastCommitSHA"));
    }

    #[test]
    fn test_save_round_trip() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("WORKFLOW_MASTER.md");
        std::fs::write(&path, DOC).unwrap();

        let mut s = StateFile::load(&path).unwrap();
        s.set("CurrentStage", "Validator");
        s.save().unwrap();

        let reloaded = StateFile::load(&path).unwrap();
        assert_eq!(reloaded.get("CurrentStage"), Some("Validator"));
        assert_eq!(reloaded.get("RequirementPointer"), Some("3"));
    }
}

// Output formatting utilities

use crate::git::DiffStats;
use crate::models::Stage;
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";

const ANSI_FG_RED: &str = "\x1b[31m";
const ANSI_FG_GREEN: &str = "\x1b[32m";
const ANSI_FG_YELLOW: &str = "\x1b[33m";
const ANSI_FG_MAGENTA: &str = "\x1b[35m";
const ANSI_FG_CYAN: &str = "\x1b[36m";
const ANSI_FG_BRIGHT_BLACK: &str = "\x1b[90m";

/// Whether output should be colored (stdout is a terminal).
fn use_color() -> bool {
    std::io::stdout().is_terminal()
}

/// Wrap `text` in `color`, when stdout is a terminal.
fn paint(text: &str, color: &str) -> String {
    if use_color() {
        format!("{}{}{}", color, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Color assigned to each stage in dashboards.
fn stage_color(stage: Stage) -> &'static str {
    match stage {
        Stage::Engineer => ANSI_FG_CYAN,
        Stage::Researcher => ANSI_FG_MAGENTA,
        Stage::Coder => ANSI_FG_YELLOW,
        Stage::Validator => ANSI_FG_GREEN,
        Stage::Deployer => ANSI_FG_RED,
    }
}

/// Get terminal width for line truncation.
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// 80 columns when not attached to a terminal.
pub fn terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        w as usize
    } else {
        80
    }
}

/// Truncate a line to `width` characters, marking the cut with an ellipsis.
fn truncate(line: &str, width: usize) -> String {
    if line.chars().count() <= width || width < 2 {
        return line.to_string();
    }
    let kept: String = line.chars().take(width - 1).collect();
    format!("{}…", kept)
}

/// One-line rendering of change statistics.
pub fn format_stats(stats: &DiffStats) -> String {
    format!(
        "{} files changed, +{} / -{}",
        stats.files_changed, stats.insertions, stats.deletions
    )
}

/// Render the workflow status dashboard.
pub fn format_status(
    entries: &[(String, String)],
    stage: Stage,
    stats: Option<&DiffStats>,
    clean: Option<bool>,
) -> String {
    let width = terminal_width();
    // +1 for the colon appended to each key.
    let key_width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0) + 1;

    let mut out = String::new();
    out.push_str(&paint("--- DW6 Workflow Status ---", ANSI_BOLD));
    out.push('\n');

    for (key, value) in entries {
        let value = if key == "CurrentStage" {
            paint(value, stage_color(stage))
        } else {
            value.clone()
        };
        let line = format!("  {:<key_width$}  {}", format!("{}:", key), value);
        out.push_str(&truncate(&line, width));
        out.push('\n');
    }

    if let Some(stats) = stats {
        out.push('\n');
        out.push_str(&format!(
            "  Changes since last approval: {}\n",
            format_stats(stats)
        ));
    }
    if let Some(clean) = clean {
        let tree = if clean {
            paint("clean", ANSI_FG_GREEN)
        } else {
            paint("dirty", ANSI_FG_YELLOW)
        };
        out.push_str(&format!("  Working tree: {}\n", tree));
    }

    out.push_str(&paint("---------------------------", ANSI_BOLD));
    out
}

/// Header printed before a review diff.
pub fn format_review_header(stage: Stage, from: &str, to: &str, from_root: bool) -> String {
    let mut out = String::new();
    if from_root {
        out.push_str(&paint(
            "No previous approved commit; comparing against the first commit.",
            ANSI_FG_BRIGHT_BLACK,
        ));
        out.push('\n');
    }
    out.push_str(&format!(
        "Comparing {} changes from {} to {}",
        paint(stage.as_str(), stage_color(stage)),
        short_sha(from),
        short_sha(to)
    ));
    out
}

/// Shorten a commit sha for display.
pub fn short_sha(sha: &str) -> &str {
    &sha[..7.min(sha.len())]
}

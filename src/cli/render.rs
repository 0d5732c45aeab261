//! Terminal rendering for the interactive front end: bordered panels, the
//! dim status line, the startup banner and `/help`.

use std::path::Path;

use super::command::COMMANDS;
use crate::context::RepoSnapshot;

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// `text` inside a rounded box, followed by a blank line.
pub fn panel(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let rule = "─".repeat(width + 2);

    let mut out = format!("╭{rule}╮\n");
    for line in &lines {
        let pad = width - line.chars().count();
        out.push_str(&format!("│ {line}{} │\n", " ".repeat(pad)));
    }
    out.push_str(&format!("╰{rule}╯\n"));
    out
}

/// `~/<path>` when `path` is under `home`, the full path otherwise.
pub fn tilde_path(path: &Path, home: Option<&Path>) -> String {
    match home.and_then(|h| path.strip_prefix(h).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => "~".into(),
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    }
}

/// `<venv> ~/<cwd> git:(<branch>)±<n>`, without ANSI styling. The git part
/// is omitted outside a working copy, the dirty marker when it is clean.
pub fn status_line(venv: Option<&str>, cwd: &str, snapshot: &RepoSnapshot) -> String {
    let mut parts = Vec::new();
    if let Some(venv) = venv {
        parts.push(venv.to_string());
    }
    parts.push(cwd.to_string());
    if !snapshot.is_empty() {
        let mut git = format!("git:({})", snapshot.branch);
        if snapshot.is_dirty() {
            git.push_str(&format!("±{}", snapshot.dirty_count()));
        }
        parts.push(git);
    }
    parts.join(" ")
}

pub fn dim(text: &str) -> String {
    format!("{DIM}{text}{RESET}")
}

/// The first four hyphen-separated groups of a random UUID, hyphen included.
pub fn session_id() -> String {
    let id = uuid::Uuid::new_v4().hyphenated().to_string();
    id[..24].to_string()
}

pub fn banner(session: &str, workdir: &str, model: &str) -> String {
    panel(&format!(
        "✻ MCP Dev Agent (research preview) v{}\n\n  localhost session: {session}\n  └ workdir: {workdir}\n  └ model: {model}",
        env!("CARGO_PKG_VERSION")
    ))
}

pub fn help() -> String {
    let width = COMMANDS.iter().map(|c| c.usage.chars().count()).max().unwrap_or(0);
    let mut out = String::from("Available commands:\n");
    for command in COMMANDS {
        let pad = width - command.usage.chars().count();
        out.push_str(&format!(
            "\n  {}{}  {}",
            command.usage,
            " ".repeat(pad),
            command.description
        ));
    }
    out
}

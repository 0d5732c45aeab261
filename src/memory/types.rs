//! Core memory type definitions.
//!
//! Defines [`ContextType`] (the closed set of tags driving filtered
//! retrieval), [`MemoryRecord`] (a stored row) and [`GitContext`] (the
//! repository fields attached to repository-scoped writes).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Metadata bag attached to every record.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Closed set of context tags. Unknown values are rejected on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// Free-form notes.
    General,
    /// Notes tied to the local working copy (branch, commit, files changed).
    Repository,
    /// Model-generated issue summaries.
    IssueSummary,
    GithubSummarize,
    /// Rendered organization project boards.
    GithubProject,
}

impl ContextType {
    pub const ALL: [ContextType; 5] = [
        Self::General,
        Self::Repository,
        Self::IssueSummary,
        Self::GithubSummarize,
        Self::GithubProject,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Repository => "repository",
            Self::IssueSummary => "issue_summary",
            Self::GithubSummarize => "github_summarize",
            Self::GithubProject => "github_project",
        }
    }

    /// Context type an auto-memory write uses for a given tool.
    pub fn for_tool(tool: &str) -> Self {
        match tool {
            "summarize_issue" => Self::IssueSummary,
            "get_project_info" => Self::GithubProject,
            "get_repo_info" | "get_diffs" | "add_repo_memory" => Self::Repository,
            _ => Self::General,
        }
    }

    /// Wire names, in the same order as [`ContextType::ALL`].
    pub const NAMES: &'static [&'static str] = &[
        "general",
        "repository",
        "issue_summary",
        "github_summarize",
        "github_project",
    ];
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContextType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown context type: {s}"))
    }
}

/// A stored memory.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryRecord {
    pub id: String,
    pub content: String,
    pub context_type: ContextType,
    pub metadata: Metadata,
    /// Cosine distance to the query; `None` outside of query results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl MemoryRecord {
    pub fn timestamp(&self) -> &str {
        self.metadata
            .get("timestamp")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown time")
    }

    /// `[context_type — timestamp] content`
    pub fn render(&self) -> String {
        format!("[{} — {}] {}", self.context_type, self.timestamp(), self.content)
    }
}

/// Repository fields attached to repository-scoped writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitContext {
    pub branch: Option<String>,
    pub last_commit: Option<String>,
    pub modified: usize,
    pub staged: usize,
}

/// Deterministic record id: rewrites of the same `(content, context_type)`
/// coalesce onto one row.
pub fn memory_id(content: &str, context_type: ContextType) -> String {
    let mut hasher = Sha256::new();
    hasher.update(context_type.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    format!("mem-{}", hex::encode(&digest[..16]))
}

/// First `max_chars` characters of `content`, on a char boundary.
pub fn content_prefix(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

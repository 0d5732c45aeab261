//! Local working-copy tools and their text rendering.

use async_trait::async_trait;

use super::params::{ParamKind, ParamSpec, ToolArgs};
use super::registry::{RetryPolicy, ToolDescriptor, ToolHandler};
use crate::clients::local_repo::{CommitSummary, DiffStatus, FileDiff, LocalRepo, RepoInfo};
use crate::error::{RepoError, ToolFailure};

pub const DEFAULT_HISTORY_LIMIT: u64 = 5;

/// Fixed reply of the local `get_issues` tool.
pub const ISSUES_ADVISORY: &str = "Accessing issues requires the GitHub integration. \
     Configure a token and use get_repository_issues with an owner/name repository.";

pub fn descriptors(repo: &LocalRepo) -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "get_commit_history",
            "Recent commits of the local repository, newest first.",
            CommitHistory { repo: repo.clone() },
        )
        .param(ParamSpec::new(
            "limit",
            ParamKind::Optional(&ParamKind::Integer),
            "Number of commits (default 5)",
        ))
        .retry(RetryPolicy::Idempotent),
        ToolDescriptor::new(
            "get_issues",
            "Open issues of the local repository.",
            Issues,
        ),
        ToolDescriptor::new(
            "get_repo_info",
            "Branch, last commit, remotes and change counts of the local repository.",
            RepoInfoTool { repo: repo.clone() },
        )
        .retry(RetryPolicy::Idempotent),
        ToolDescriptor::new(
            "get_diffs",
            "Unstaged and staged diffs of the local repository.",
            Diffs { repo: repo.clone() },
        )
        .retry(RetryPolicy::Idempotent),
    ]
}

fn repo_failure(e: RepoError) -> ToolFailure {
    match e {
        RepoError::NotARepository => ToolFailure(e.to_string()),
        other => ToolFailure::new("reading repository", other),
    }
}

struct CommitHistory {
    repo: LocalRepo,
}

#[async_trait]
impl ToolHandler for CommitHistory {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        let limit = args.get_u64("limit").unwrap_or(DEFAULT_HISTORY_LIMIT).max(1) as usize;
        let commits = self.repo.history(limit).await.map_err(repo_failure)?;
        Ok(render_commits(&commits))
    }
}

struct Issues;

#[async_trait]
impl ToolHandler for Issues {
    async fn call(&self, _args: ToolArgs) -> Result<String, ToolFailure> {
        Ok(ISSUES_ADVISORY.to_string())
    }
}

struct RepoInfoTool {
    repo: LocalRepo,
}

#[async_trait]
impl ToolHandler for RepoInfoTool {
    async fn call(&self, _args: ToolArgs) -> Result<String, ToolFailure> {
        let info = self.repo.info().await.map_err(repo_failure)?;
        Ok(render_repo_info(&info))
    }
}

struct Diffs {
    repo: LocalRepo,
}

#[async_trait]
impl ToolHandler for Diffs {
    async fn call(&self, _args: ToolArgs) -> Result<String, ToolFailure> {
        let diffs = self.repo.diffs().await.map_err(repo_failure)?;
        Ok(render_diffs(&diffs))
    }
}

pub fn render_commits(commits: &[CommitSummary]) -> String {
    if commits.is_empty() {
        return "No commits yet".into();
    }
    commits
        .iter()
        .map(|c| format!("Commit: {}\nAuthor: {}\nMessage: {}", c.short_id, c.author, c.message))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_repo_info(info: &RepoInfo) -> String {
    let last_commit = match (&info.last_commit, &info.author) {
        (Some(id), Some(author)) => format!("{id} by {author}"),
        (Some(id), None) => id.clone(),
        (None, _) => "none (no commits yet)".into(),
    };
    let remotes = if info.remotes.is_empty() {
        "No remotes".to_string()
    } else {
        info.remotes.join(", ")
    };
    format!(
        "Repository Info:\n\
         Branch: {}\n\
         Last Commit: {last_commit}\n\
         Remotes: {remotes}\n\
         Status:\n\
         - {} untracked files\n\
         - {} modified files\n\
         - {} staged changes",
        info.branch, info.untracked, info.modified, info.staged
    )
}

pub fn render_diffs(diffs: &[FileDiff]) -> String {
    if diffs.is_empty() {
        return "No changes found".into();
    }
    diffs
        .iter()
        .map(|d| {
            let stage = match d.status {
                DiffStatus::Modified => "unstaged",
                DiffStatus::Staged => "staged",
            };
            format!(
                "File: {}\nStatus: {} ({stage})\nChanges:\n{}\n---",
                d.path,
                d.status.as_str(),
                d.body.trim_end()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_info_block() {
        let info = RepoInfo {
            branch: "main".into(),
            last_commit: Some("abc1234".into()),
            author: Some("Ada".into()),
            remotes: vec![],
            untracked: 1,
            modified: 2,
            staged: 0,
        };
        let text = render_repo_info(&info);
        assert!(text.starts_with("Repository Info:\nBranch: main\n"));
        assert!(text.contains("Last Commit: abc1234 by Ada"));
        assert!(text.contains("Remotes: No remotes"));
        assert!(text.contains("- 2 modified files"));
    }

    #[test]
    fn diff_blocks_mark_stage() {
        let diffs = vec![FileDiff {
            path: "a.txt".into(),
            status: DiffStatus::Staged,
            body: "@@ -1 +1 @@\n-old\n+new\n".into(),
        }];
        assert_eq!(
            render_diffs(&diffs),
            "File: a.txt\nStatus: staged (staged)\nChanges:\n@@ -1 +1 @@\n-old\n+new\n---"
        );
        assert_eq!(render_diffs(&[]), "No changes found");
    }

    #[test]
    fn commit_blocks_are_blank_line_separated() {
        let commits = vec![
            CommitSummary {
                short_id: "1111111".into(),
                author: "Ada".into(),
                message: "two".into(),
            },
            CommitSummary {
                short_id: "2222222".into(),
                author: "Ada".into(),
                message: "one".into(),
            },
        ];
        let text = render_commits(&commits);
        assert_eq!(text.split("\n\n").count(), 2);
        assert!(text.starts_with("Commit: 1111111\n"));
    }

    #[tokio::test]
    async fn issues_stub_returns_advisory() {
        let text = Issues.call(ToolArgs::default()).await.unwrap();
        assert_eq!(text, ISSUES_ADVISORY);
    }
}

//! Code-hosting tools: repository details, issues, pull requests, code
//! search, organization projects and model-generated issue summaries.

use async_trait::async_trait;
use std::sync::Arc;

use super::params::{ParamKind, ParamSpec, ToolArgs};
use super::registry::{AutoMemory, RetryPolicy, ToolDescriptor, ToolHandler};
use crate::clients::github::{
    CodeHit, CodeHost, IssueDetail, IssueState, IssueSummary, ProjectBoard, PullSummary,
    RepoDetails,
};
use crate::clients::model::LanguageModel;
use crate::error::{CodeHostError, ToolFailure};

const REPO: ParamSpec = ParamSpec::new("repo", ParamKind::String, "Repository as owner/name");
const STATE: ParamSpec = ParamSpec::new(
    "state",
    ParamKind::Optional(&ParamKind::Enum(&IssueState::NAMES)),
    "open (default) or closed",
);

pub fn descriptors(host: Arc<dyn CodeHost>, model: Arc<dyn LanguageModel>) -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "get_repo_details",
            "Description, stars, forks, open issues, language and topics of a repository.",
            RepoDetailsTool { host: host.clone() },
        )
        .param(REPO)
        .retry(RetryPolicy::Idempotent),
        ToolDescriptor::new(
            "get_repository_issues",
            "Up to ten issues of a repository (pull requests excluded).",
            RepositoryIssues { host: host.clone() },
        )
        .param(REPO)
        .param(STATE)
        .retry(RetryPolicy::Idempotent),
        ToolDescriptor::new(
            "get_pull_requests",
            "Up to ten pull requests of a repository.",
            PullRequests { host: host.clone() },
        )
        .param(REPO)
        .param(STATE)
        .retry(RetryPolicy::Idempotent),
        ToolDescriptor::new(
            "search_github_code",
            "Search code across GitHub, optionally restricted to one language.",
            SearchCode { host: host.clone() },
        )
        .param(ParamSpec::new("query", ParamKind::String, "Search terms"))
        .param(ParamSpec::new(
            "language",
            ParamKind::Optional(&ParamKind::String),
            "Language qualifier, e.g. rust",
        ))
        .retry(RetryPolicy::Idempotent),
        ToolDescriptor::new(
            "get_project_info",
            "Columns and cards of an organization project board.",
            ProjectInfo { host: host.clone() },
        )
        .param(ParamSpec::new("org", ParamKind::String, "Organization login"))
        .param(ParamSpec::new("number", ParamKind::Integer, "Project number"))
        .auto_memory(AutoMemory::Raw),
        ToolDescriptor::new(
            "summarize_issue",
            "Summarize an issue and its discussion with the language model.",
            SummarizeIssue { host, model },
        )
        .param(REPO)
        .param(ParamSpec::new("issue_number", ParamKind::Integer, "Issue number"))
        .auto_memory(AutoMemory::Summary),
    ]
}

fn state(args: &ToolArgs) -> Result<IssueState, ToolFailure> {
    args.get_str("state")
        .unwrap_or("open")
        .parse()
        .map_err(|e: String| ToolFailure::new("reading state", e))
}

struct RepoDetailsTool {
    host: Arc<dyn CodeHost>,
}

#[async_trait]
impl ToolHandler for RepoDetailsTool {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        let details = self
            .host
            .get_repo(args.str("repo"))
            .await
            .map_err(|e| ToolFailure::new("getting repository details", e))?;
        Ok(render_repo_details(&details))
    }
}

struct RepositoryIssues {
    host: Arc<dyn CodeHost>,
}

#[async_trait]
impl ToolHandler for RepositoryIssues {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        let repo = args.str("repo");
        let state = state(&args)?;
        let issues = self
            .host
            .issues(repo, state)
            .await
            .map_err(|e| ToolFailure::new("getting issues", e))?;
        if issues.is_empty() {
            return Ok(format!("No {} issues found in {repo}", state.as_str()));
        }
        Ok(render_issues(&issues))
    }
}

struct PullRequests {
    host: Arc<dyn CodeHost>,
}

#[async_trait]
impl ToolHandler for PullRequests {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        let repo = args.str("repo");
        let state = state(&args)?;
        let pulls = self
            .host
            .pulls(repo, state)
            .await
            .map_err(|e| ToolFailure::new("getting pull requests", e))?;
        if pulls.is_empty() {
            return Ok(format!("No {} pull requests found in {repo}", state.as_str()));
        }
        Ok(render_pulls(&pulls))
    }
}

struct SearchCode {
    host: Arc<dyn CodeHost>,
}

#[async_trait]
impl ToolHandler for SearchCode {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        let query = args.str("query");
        let hits = self
            .host
            .search_code(query, args.get_str("language"))
            .await
            .map_err(|e| ToolFailure::new("searching code", e))?;
        if hits.is_empty() {
            return Ok(format!("No code found for '{query}'"));
        }
        Ok(render_code_hits(&hits))
    }
}

struct ProjectInfo {
    host: Arc<dyn CodeHost>,
}

#[async_trait]
impl ToolHandler for ProjectInfo {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        let number = args.get_u64("number").unwrap_or_default();
        let board = self
            .host
            .project(args.str("org"), number)
            .await
            .map_err(|e| ToolFailure::new("getting project info", e))?;
        Ok(render_project(&board))
    }
}

struct SummarizeIssue {
    host: Arc<dyn CodeHost>,
    model: Arc<dyn LanguageModel>,
}

#[async_trait]
impl ToolHandler for SummarizeIssue {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        let repo = args.str("repo");
        let number = args.get_u64("issue_number").unwrap_or_default();

        let issue = match self.host.get_issue(repo, number).await {
            Ok(issue) => issue,
            Err(CodeHostError::NotFound(_)) => {
                return Err(ToolFailure(format!("Issue #{number} not found in {repo}")));
            }
            Err(e) => return Err(ToolFailure::new("summarizing issue", e)),
        };

        let summary = self
            .model
            .generate(&summary_prompt(&issue))
            .await
            .map_err(|e| ToolFailure::new("generating summary", e))?;

        Ok(format!("Issue #{number} ({repo}) summary:\n{summary}"))
    }
}

fn summary_prompt(issue: &IssueDetail) -> String {
    let mut prompt = format!(
        "Summarize the following GitHub issue in a few sentences. \
         State the problem, the current status and any proposed solutions.\n\n\
         Title: {}\nState: {}\nAuthor: {}\n\n{}\n",
        issue.title,
        issue.state,
        issue.author,
        issue.body.as_deref().unwrap_or("(no description)")
    );
    if !issue.comments.is_empty() {
        prompt.push_str("\nComments:\n");
        for comment in &issue.comments {
            prompt.push_str(&format!("- {}: {}\n", comment.author, comment.body.trim()));
        }
    }
    prompt
}

pub fn render_repo_details(r: &RepoDetails) -> String {
    format!(
        "Repository: {}\nDescription: {}\nStars: {}\nForks: {}\nOpen Issues: {}\nMain Language: {}\nTopics: {}",
        r.name,
        r.description.as_deref().unwrap_or("No description"),
        r.stars,
        r.forks,
        r.open_issues,
        r.language.as_deref().unwrap_or("Unknown"),
        if r.topics.is_empty() {
            "None".to_string()
        } else {
            r.topics.join(", ")
        }
    )
}

pub fn render_issues(issues: &[IssueSummary]) -> String {
    issues
        .iter()
        .map(|i| {
            let labels = if i.labels.is_empty() {
                "None".to_string()
            } else {
                i.labels.join(", ")
            };
            format!(
                "#{} - {}\nState: {}\nCreated: {}\nLabels: {labels}\n---",
                i.number, i.title, i.state, i.created_at
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_pulls(pulls: &[PullSummary]) -> String {
    pulls
        .iter()
        .map(|p| {
            format!(
                "#{} - {}\nState: {}\nAuthor: {}\nCreated: {}\nBranch: {} -> {}\n---",
                p.number, p.title, p.state, p.author, p.created_at, p.head, p.base
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_code_hits(hits: &[CodeHit]) -> String {
    hits.iter()
        .map(|h| {
            format!(
                "File: {}\nRepository: {}\nURL: {}\nContent:\n{}\n---",
                h.path, h.repository, h.url, h.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_project(board: &ProjectBoard) -> String {
    let mut out = format!("Project: {} (#{}) [{}]\n", board.name, board.number, board.state);
    if let Some(body) = board.body.as_deref().filter(|b| !b.trim().is_empty()) {
        out.push_str(body.trim());
        out.push('\n');
    }
    for column in &board.columns {
        out.push_str(&format!("\nColumn: {} ({} cards)\n", column.name, column.total_cards));
        for card in &column.cards {
            out.push_str(&format!("- {card}\n"));
        }
        let hidden = column.total_cards.saturating_sub(column.cards.len());
        if hidden > 0 {
            out.push_str(&format!("… {hidden} more\n"));
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::github::ProjectColumn;

    #[test]
    fn project_marks_truncated_columns() {
        let board = ProjectBoard {
            name: "Roadmap".into(),
            number: 42,
            body: None,
            state: "open".into(),
            columns: vec![
                ProjectColumn {
                    name: "Todo".into(),
                    total_cards: 3,
                    cards: vec!["a".into(), "b".into(), "c".into()],
                },
                ProjectColumn {
                    name: "Done".into(),
                    total_cards: 7,
                    cards: (1..=5).map(|i| format!("card {i}")).collect(),
                },
            ],
        };
        let text = render_project(&board);
        assert!(text.starts_with("Project: Roadmap (#42) [open]"));
        assert!(text.contains("Column: Todo (3 cards)\n- a\n- b\n- c\n"));
        assert!(text.ends_with("- card 5\n… 2 more"));
        assert_eq!(text.matches('…').count(), 1);
    }

    #[test]
    fn issue_blocks_end_with_separator() {
        let issues = vec![IssueSummary {
            number: 7,
            title: "Crash on start".into(),
            state: "open".into(),
            created_at: "2026-01-02T00:00:00Z".into(),
            labels: vec!["bug".into()],
        }];
        assert_eq!(
            render_issues(&issues),
            "#7 - Crash on start\nState: open\nCreated: 2026-01-02T00:00:00Z\nLabels: bug\n---"
        );
    }

    #[test]
    fn prompt_includes_comments() {
        let issue = IssueDetail {
            number: 1,
            title: "Slow build".into(),
            state: "open".into(),
            author: "ada".into(),
            body: Some("Takes ages".into()),
            comments: vec![crate::clients::github::IssueComment {
                author: "bob".into(),
                body: "same here ".into(),
            }],
        };
        let prompt = summary_prompt(&issue);
        assert!(prompt.contains("Title: Slow build"));
        assert!(prompt.contains("- bob: same here\n"));
    }
}

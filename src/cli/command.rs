//! Slash-command grammar for the interactive front end.
//!
//! The first token after `/` selects a group, the second a verb, the rest are
//! positional. A trailing free-text argument takes the space-joined remainder.

use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::clients::github::IssueState;
use crate::tools::git::DEFAULT_HISTORY_LIMIT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Exit,
    MemoryAdd(String),
    MemoryGet(String),
    RepoMemoryAdd(String),
    RepoMemoryGet(String),
    Docs(String),
    GitCommits(u64),
    GitIssues,
    GitInfo,
    GitDiff,
    GithubRepo(String),
    GithubIssues { repo: String, state: IssueState },
    GithubPrs { repo: String, state: IssueState },
    GithubProject { org: String, number: u64 },
    GithubSummarize { repo: String, number: u64 },
    GithubSearch { query: String, language: Option<String> },
    CodeAnalyze { path: PathBuf, language: Option<String> },
}

/// One `/help` entry. `example` must parse.
pub struct CommandHelp {
    pub usage: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

pub const COMMANDS: &[CommandHelp] = &[
    CommandHelp {
        usage: "/help",
        description: "Show this help",
        example: "/help",
    },
    CommandHelp {
        usage: "/memory add <content…>",
        description: "Remember a note",
        example: "/memory add the build uses cargo-nextest",
    },
    CommandHelp {
        usage: "/memory get <query…>",
        description: "Recall notes similar to a query",
        example: "/memory get build",
    },
    CommandHelp {
        usage: "/memory repo add <content…>",
        description: "Remember a note about this repository",
        example: "/memory repo add parser refactor in progress",
    },
    CommandHelp {
        usage: "/memory repo get <query…>",
        description: "Recall repository notes",
        example: "/memory repo get parser",
    },
    CommandHelp {
        usage: "/docs <query…>",
        description: "Ask the API reference",
        example: "/docs how do sessions expire",
    },
    CommandHelp {
        usage: "/git commits [n]",
        description: "Recent commits (default 5)",
        example: "/git commits 3",
    },
    CommandHelp {
        usage: "/git issues",
        description: "Issues of the local repository",
        example: "/git issues",
    },
    CommandHelp {
        usage: "/git info",
        description: "Branch, last commit, remotes and status",
        example: "/git info",
    },
    CommandHelp {
        usage: "/git diff",
        description: "Unstaged and staged changes",
        example: "/git diff",
    },
    CommandHelp {
        usage: "/github repo <owner/name>",
        description: "Repository details",
        example: "/github repo octocat/hello-world",
    },
    CommandHelp {
        usage: "/github issues <owner/name> [state]",
        description: "Issues (open or closed, default open)",
        example: "/github issues octocat/hello-world closed",
    },
    CommandHelp {
        usage: "/github prs <owner/name> [state]",
        description: "Pull requests (open or closed, default open)",
        example: "/github prs octocat/hello-world",
    },
    CommandHelp {
        usage: "/github project <org> <number>",
        description: "Organization project board",
        example: "/github project my-org 42",
    },
    CommandHelp {
        usage: "/github summarize <owner/name> <number>",
        description: "Summarize an issue with the model",
        example: "/github summarize octocat/hello-world 1",
    },
    CommandHelp {
        usage: "/github search <query…>[ in:<lang>]",
        description: "Search code on GitHub",
        example: "/github search tokio select in:rust",
    },
    CommandHelp {
        usage: "/code analyze <path> [language]",
        description: "Functions, classes and imports of a file",
        example: "/code analyze sample.py",
    },
    CommandHelp {
        usage: "exit",
        description: "Leave the session",
        example: "exit",
    },
];

/// A malformed or unknown command. Carries the hint to print.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

impl UsageError {
    fn usage(usage: &str) -> Self {
        Self(format!("Usage: {usage}"))
    }

    fn group(prefix: &str) -> Self {
        let lines: Vec<&str> = COMMANDS
            .iter()
            .map(|c| c.usage)
            .filter(|u| u.starts_with(prefix))
            .collect();
        Self(format!("Usage:\n  {}", lines.join("\n  ")))
    }
}

fn remainder(tokens: &[&str], usage: &str) -> Result<String, UsageError> {
    if tokens.is_empty() {
        Err(UsageError::usage(usage))
    } else {
        Ok(tokens.join(" "))
    }
}

/// Counts and GitHub numbers start at 1.
fn number(token: &str, usage: &str) -> Result<u64, UsageError> {
    match token.parse() {
        Ok(0) | Err(_) => Err(UsageError::usage(usage)),
        Ok(n) => Ok(n),
    }
}

fn state(token: Option<&&str>, usage: &str) -> Result<IssueState, UsageError> {
    match token {
        None => Ok(IssueState::Open),
        Some(s) => s.parse().map_err(|_| UsageError::usage(usage)),
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, UsageError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["exit"] | ["/exit"] | ["quit"] => Ok(Self::Exit),
            ["/help"] => Ok(Self::Help),
            ["/memory", "repo", "add", rest @ ..] => {
                remainder(rest, "/memory repo add <content…>").map(Self::RepoMemoryAdd)
            }
            ["/memory", "repo", "get", rest @ ..] => {
                remainder(rest, "/memory repo get <query…>").map(Self::RepoMemoryGet)
            }
            ["/memory", "add", rest @ ..] => {
                remainder(rest, "/memory add <content…>").map(Self::MemoryAdd)
            }
            ["/memory", "get", rest @ ..] => {
                remainder(rest, "/memory get <query…>").map(Self::MemoryGet)
            }
            ["/memory", ..] => Err(UsageError::group("/memory")),
            ["/docs", rest @ ..] => remainder(rest, "/docs <query…>").map(Self::Docs),
            ["/git", "commits"] => Ok(Self::GitCommits(DEFAULT_HISTORY_LIMIT)),
            ["/git", "commits", n] => number(n, "/git commits [n]").map(Self::GitCommits),
            ["/git", "issues"] => Ok(Self::GitIssues),
            ["/git", "info"] => Ok(Self::GitInfo),
            ["/git", "diff"] => Ok(Self::GitDiff),
            ["/git", ..] => Err(UsageError::group("/git")),
            ["/github", "repo", repo] => Ok(Self::GithubRepo(repo.to_string())),
            ["/github", "issues", repo, rest @ ..] if rest.len() <= 1 => Ok(Self::GithubIssues {
                repo: repo.to_string(),
                state: state(rest.first(), "/github issues <owner/name> [state]")?,
            }),
            ["/github", "prs", repo, rest @ ..] if rest.len() <= 1 => Ok(Self::GithubPrs {
                repo: repo.to_string(),
                state: state(rest.first(), "/github prs <owner/name> [state]")?,
            }),
            ["/github", "project", org, n] => Ok(Self::GithubProject {
                org: org.to_string(),
                number: number(n, "/github project <org> <number>")?,
            }),
            ["/github", "summarize", repo, n] => Ok(Self::GithubSummarize {
                repo: repo.to_string(),
                number: number(n, "/github summarize <owner/name> <number>")?,
            }),
            ["/github", "search", rest @ ..] => {
                let (terms, language) = match rest.split_last() {
                    Some((last, terms)) if last.starts_with("in:") && last.len() > 3 => {
                        (terms, Some(last[3..].to_string()))
                    }
                    _ => (rest, None),
                };
                Ok(Self::GithubSearch {
                    query: remainder(terms, "/github search <query…>[ in:<lang>]")?,
                    language,
                })
            }
            ["/github", ..] => Err(UsageError::group("/github")),
            ["/code", "analyze", path] => Ok(Self::CodeAnalyze {
                path: PathBuf::from(path),
                language: None,
            }),
            ["/code", "analyze", path, language] => Ok(Self::CodeAnalyze {
                path: PathBuf::from(path),
                language: Some(language.to_string()),
            }),
            ["/code", ..] => Err(UsageError::group("/code")),
            _ => Err(UsageError(
                "Unknown command. Type /help for the list of commands.".into(),
            )),
        }
    }

    /// Tool name and parameters for commands that map one-to-one onto a tool.
    /// `/help`, `exit` and `/code analyze` (which reads a file first) return `None`.
    pub fn tool_call(&self) -> Option<(&'static str, Map<String, Value>)> {
        let mut params = Map::new();
        let mut put = |key: &str, value: Value| {
            params.insert(key.to_string(), value);
        };
        let tool = match self {
            Self::Help | Self::Exit | Self::CodeAnalyze { .. } => return None,
            Self::MemoryAdd(content) => {
                put("content", content.as_str().into());
                "add_memory"
            }
            Self::MemoryGet(query) => {
                put("query", query.as_str().into());
                "get_memory"
            }
            Self::RepoMemoryAdd(content) => {
                put("content", content.as_str().into());
                "add_repo_memory"
            }
            Self::RepoMemoryGet(query) => {
                put("query", query.as_str().into());
                "get_repo_memory"
            }
            Self::Docs(query) => {
                put("query", query.as_str().into());
                "search_docs"
            }
            Self::GitCommits(limit) => {
                put("limit", (*limit).into());
                "get_commit_history"
            }
            Self::GitIssues => "get_issues",
            Self::GitInfo => "get_repo_info",
            Self::GitDiff => "get_diffs",
            Self::GithubRepo(repo) => {
                put("repo", repo.as_str().into());
                "get_repo_details"
            }
            Self::GithubIssues { repo, state } => {
                put("repo", repo.as_str().into());
                put("state", state.as_str().into());
                "get_repository_issues"
            }
            Self::GithubPrs { repo, state } => {
                put("repo", repo.as_str().into());
                put("state", state.as_str().into());
                "get_pull_requests"
            }
            Self::GithubProject { org, number } => {
                put("org", org.as_str().into());
                put("number", (*number).into());
                "get_project_info"
            }
            Self::GithubSummarize { repo, number } => {
                put("repo", repo.as_str().into());
                put("issue_number", (*number).into());
                "summarize_issue"
            }
            Self::GithubSearch { query, language } => {
                put("query", query.as_str().into());
                if let Some(language) = language {
                    put("language", language.as_str().into());
                }
                "search_github_code"
            }
        };
        Some((tool, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_text_takes_the_remainder() {
        assert_eq!(
            Command::parse("/memory add hello   world").unwrap(),
            Command::MemoryAdd("hello world".into())
        );
        assert_eq!(
            Command::parse("/memory repo get parser state").unwrap(),
            Command::RepoMemoryGet("parser state".into())
        );
    }

    #[test]
    fn defaults_apply() {
        assert_eq!(Command::parse("/git commits").unwrap(), Command::GitCommits(5));
        assert_eq!(
            Command::parse("/github prs a/b").unwrap(),
            Command::GithubPrs {
                repo: "a/b".into(),
                state: IssueState::Open
            }
        );
    }

    #[test]
    fn search_language_suffix() {
        assert_eq!(
            Command::parse("/github search retry backoff in:go").unwrap(),
            Command::GithubSearch {
                query: "retry backoff".into(),
                language: Some("go".into())
            }
        );
        assert!(Command::parse("/github search in:go").is_err());
    }

    #[test]
    fn malformed_commands_give_usage_hints() {
        let err = Command::parse("/git commits many").unwrap_err();
        assert_eq!(err.0, "Usage: /git commits [n]");
        assert_eq!(Command::parse("/git commits 0").unwrap_err(), err);
        assert!(Command::parse("/github project my-org 0").is_err());
        assert!(Command::parse("/github project my-org").unwrap_err().0.contains("/github project"));
        assert!(Command::parse("/github issues a/b merged").is_err());
        assert!(Command::parse("/memory add").is_err());
        assert!(Command::parse("/nope").unwrap_err().0.contains("/help"));
    }

    #[test]
    fn summarize_maps_to_tool_parameters() {
        let (tool, params) = Command::parse("/github summarize octocat/hello-world 7")
            .unwrap()
            .tool_call()
            .unwrap();
        assert_eq!(tool, "summarize_issue");
        assert_eq!(params["repo"], "octocat/hello-world");
        assert_eq!(params["issue_number"], 7);
    }
}

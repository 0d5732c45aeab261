//! Code-hosting client for the GitHub REST API.
//!
//! [`CodeHost`] is the seam the tools depend on; [`GithubClient`] implements it
//! over `reqwest`. Page sizes are clamped here: issues and pull requests at
//! [`LIST_LIMIT`], code search at [`SEARCH_LIMIT`], project cards at
//! [`CARDS_PER_COLUMN`]. No call is retried.

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CodeHostError;

pub const LIST_LIMIT: usize = 10;
pub const SEARCH_LIMIT: usize = 5;
pub const CARDS_PER_COLUMN: usize = 5;
const SNIPPET_CHARS: usize = 300;
const COMMENT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub const NAMES: [&'static str; 2] = ["open", "closed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::str::FromStr for IssueState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("unknown state: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoDetails {
    pub name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub language: Option<String>,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub created_at: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: String,
    pub created_at: String,
    pub head: String,
    pub base: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeHit {
    pub path: String,
    pub repository: String,
    pub url: String,
    /// First characters of the file.
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectColumn {
    pub name: String,
    pub total_cards: usize,
    /// At most [`CARDS_PER_COLUMN`] titles, in board order.
    pub cards: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectBoard {
    pub name: String,
    pub number: u64,
    pub body: Option<String>,
    pub state: String,
    pub columns: Vec<ProjectColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueComment {
    pub author: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueDetail {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: String,
    pub body: Option<String>,
    pub comments: Vec<IssueComment>,
}

/// Facade over the code-hosting provider. `repo` is always `owner/name`.
#[async_trait]
pub trait CodeHost: Send + Sync {
    async fn get_repo(&self, repo: &str) -> Result<RepoDetails, CodeHostError>;

    async fn issues(&self, repo: &str, state: IssueState)
        -> Result<Vec<IssueSummary>, CodeHostError>;

    async fn pulls(&self, repo: &str, state: IssueState) -> Result<Vec<PullSummary>, CodeHostError>;

    async fn search_code(
        &self,
        query: &str,
        language: Option<&str>,
    ) -> Result<Vec<CodeHit>, CodeHostError>;

    async fn project(&self, org: &str, number: u64) -> Result<ProjectBoard, CodeHostError>;

    async fn get_issue(&self, repo: &str, number: u64) -> Result<IssueDetail, CodeHostError>;
}

/// Split and validate `owner/name`.
pub fn split_repo(full: &str) -> Result<(&str, &str), CodeHostError> {
    match full.split_once('/') {
        Some((owner, name))
            if !owner.is_empty()
                && !name.is_empty()
                && !name.contains('/')
                && !full.contains(char::is_whitespace) =>
        {
            Ok((owner, name))
        }
        _ => Err(CodeHostError::InvalidName(full.to_string())),
    }
}

pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
}

impl GithubClient {
    pub fn new(
        api_url: &str,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, CodeHostError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("devagent"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| CodeHostError::Network(format!("invalid token header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CodeHostError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, CodeHostError> {
        Url::parse_with_params(&format!("{}{path}", self.api_url), query)
            .map_err(|e| CodeHostError::Decode(format!("bad url: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, CodeHostError> {
        tracing::debug!(url = %url, "code host request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CodeHostError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CodeHostError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or(body);
            tracing::warn!(status = status.as_u16(), message = %message, "code host error");
            return Err(CodeHostError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CodeHostError::Decode(e.to_string()))
    }

    async fn card_title(&self, card: &ApiCard) -> String {
        if let Some(note) = card.note.as_deref().filter(|n| !n.trim().is_empty()) {
            return note.lines().next().unwrap_or_default().trim().to_string();
        }
        let Some(content_url) = card.content_url.as_deref() else {
            return "(empty card)".into();
        };
        let Ok(url) = Url::parse(content_url) else {
            return content_url.to_string();
        };
        match self.get_json::<ApiTitled>(url, "card content").await {
            Ok(item) => item.title,
            Err(_) => content_url.to_string(),
        }
    }
}

#[async_trait]
impl CodeHost for GithubClient {
    async fn get_repo(&self, repo: &str) -> Result<RepoDetails, CodeHostError> {
        let (owner, name) = split_repo(repo)?;
        let url = self.url(&format!("/repos/{owner}/{name}"), &[])?;
        let r: ApiRepo = self.get_json(url, &format!("Repository {repo}")).await?;
        Ok(RepoDetails {
            name: r.name,
            description: r.description,
            stars: r.stargazers_count,
            forks: r.forks_count,
            open_issues: r.open_issues_count,
            language: r.language,
            topics: r.topics,
        })
    }

    async fn issues(
        &self,
        repo: &str,
        state: IssueState,
    ) -> Result<Vec<IssueSummary>, CodeHostError> {
        let (owner, name) = split_repo(repo)?;
        let url = self.url(
            &format!("/repos/{owner}/{name}/issues"),
            &[
                ("state", state.as_str().to_string()),
                ("per_page", LIST_LIMIT.to_string()),
            ],
        )?;
        let items: Vec<ApiIssue> = self.get_json(url, &format!("Repository {repo}")).await?;
        Ok(items
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .take(LIST_LIMIT)
            .map(|i| IssueSummary {
                number: i.number,
                title: i.title,
                state: i.state,
                created_at: i.created_at,
                labels: i.labels.into_iter().map(|l| l.name).collect(),
            })
            .collect())
    }

    async fn pulls(&self, repo: &str, state: IssueState) -> Result<Vec<PullSummary>, CodeHostError> {
        let (owner, name) = split_repo(repo)?;
        let url = self.url(
            &format!("/repos/{owner}/{name}/pulls"),
            &[
                ("state", state.as_str().to_string()),
                ("per_page", LIST_LIMIT.to_string()),
            ],
        )?;
        let items: Vec<ApiPull> = self.get_json(url, &format!("Repository {repo}")).await?;
        Ok(items
            .into_iter()
            .take(LIST_LIMIT)
            .map(|p| PullSummary {
                number: p.number,
                title: p.title,
                state: p.state,
                author: p.user.login,
                created_at: p.created_at,
                head: p.head.r#ref,
                base: p.base.r#ref,
            })
            .collect())
    }

    async fn search_code(
        &self,
        query: &str,
        language: Option<&str>,
    ) -> Result<Vec<CodeHit>, CodeHostError> {
        let mut q = query.trim().to_string();
        if let Some(lang) = language.map(str::trim).filter(|l| !l.is_empty()) {
            q.push_str(&format!(" language:{lang}"));
        }
        let url = self.url(
            "/search/code",
            &[("q", q), ("per_page", SEARCH_LIMIT.to_string())],
        )?;
        let result: ApiSearch = self.get_json(url, "Search").await?;

        let mut hits = Vec::new();
        for item in result.items.into_iter().take(SEARCH_LIMIT) {
            let snippet = match Url::parse(&item.url) {
                Ok(url) => match self.get_json::<ApiContent>(url, "File").await {
                    Ok(content) => decode_snippet(&content),
                    Err(e) => format!("(content unavailable: {e})"),
                },
                Err(_) => String::new(),
            };
            hits.push(CodeHit {
                path: item.path,
                repository: item.repository.full_name,
                url: item.html_url,
                snippet,
            });
        }
        Ok(hits)
    }

    async fn project(&self, org: &str, number: u64) -> Result<ProjectBoard, CodeHostError> {
        let url = self.url(
            &format!("/orgs/{org}/projects"),
            &[("state", "all".to_string()), ("per_page", "100".to_string())],
        )?;
        let projects: Vec<ApiProject> = self.get_json(url, &format!("Organization {org}")).await?;
        let project = projects
            .into_iter()
            .find(|p| p.number == number)
            .ok_or_else(|| CodeHostError::NotFound(format!("Project #{number} in {org}")))?;

        let url = self.url(&format!("/projects/{}/columns", project.id), &[])?;
        let api_columns: Vec<ApiColumn> = self.get_json(url, "Project columns").await?;

        let mut columns = Vec::new();
        for column in api_columns {
            let url = self.url(
                &format!("/projects/columns/{}/cards", column.id),
                &[("per_page", "100".to_string())],
            )?;
            let cards: Vec<ApiCard> = self.get_json(url, "Column cards").await?;
            let mut titles = Vec::new();
            for card in cards.iter().take(CARDS_PER_COLUMN) {
                titles.push(self.card_title(card).await);
            }
            columns.push(ProjectColumn {
                name: column.name,
                total_cards: cards.len(),
                cards: titles,
            });
        }

        Ok(ProjectBoard {
            name: project.name,
            number: project.number,
            body: project.body,
            state: project.state,
            columns,
        })
    }

    async fn get_issue(&self, repo: &str, number: u64) -> Result<IssueDetail, CodeHostError> {
        let (owner, name) = split_repo(repo)?;
        let url = self.url(&format!("/repos/{owner}/{name}/issues/{number}"), &[])?;
        let issue: ApiIssue = self
            .get_json(url, &format!("Issue #{number}"))
            .await?;

        let url = self.url(
            &format!("/repos/{owner}/{name}/issues/{number}/comments"),
            &[("per_page", COMMENT_LIMIT.to_string())],
        )?;
        let comments: Vec<ApiComment> = self.get_json(url, "Issue comments").await?;

        Ok(IssueDetail {
            number: issue.number,
            title: issue.title,
            state: issue.state,
            author: issue.user.map(|u| u.login).unwrap_or_else(|| "unknown".into()),
            body: issue.body,
            comments: comments
                .into_iter()
                .take(COMMENT_LIMIT)
                .map(|c| IssueComment {
                    author: c.user.map(|u| u.login).unwrap_or_else(|| "unknown".into()),
                    body: c.body.unwrap_or_default(),
                })
                .collect(),
        })
    }
}

fn decode_snippet(content: &ApiContent) -> String {
    if content.encoding.as_deref() != Some("base64") {
        return String::new();
    }
    let compact: String = content.content.split_whitespace().collect();
    match base64::engine::general_purpose::STANDARD.decode(compact) {
        Ok(bytes) => String::from_utf8_lossy(&bytes)
            .chars()
            .take(SNIPPET_CHARS)
            .collect(),
        Err(_) => String::new(),
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct ApiRepo {
    name: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    open_issues_count: u64,
    language: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Deserialize)]
struct ApiLabel {
    name: String,
}

#[derive(Deserialize)]
struct ApiIssue {
    number: u64,
    title: String,
    state: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    body: Option<String>,
    user: Option<ApiUser>,
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ApiBranch {
    r#ref: String,
}

#[derive(Deserialize)]
struct ApiPull {
    number: u64,
    title: String,
    state: String,
    user: ApiUser,
    #[serde(default)]
    created_at: String,
    head: ApiBranch,
    base: ApiBranch,
}

#[derive(Deserialize)]
struct ApiSearchRepo {
    full_name: String,
}

#[derive(Deserialize)]
struct ApiSearchItem {
    path: String,
    url: String,
    html_url: String,
    repository: ApiSearchRepo,
}

#[derive(Deserialize)]
struct ApiSearch {
    #[serde(default)]
    items: Vec<ApiSearchItem>,
}

#[derive(Deserialize)]
struct ApiContent {
    #[serde(default)]
    content: String,
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct ApiProject {
    id: u64,
    number: u64,
    name: String,
    body: Option<String>,
    state: String,
}

#[derive(Deserialize)]
struct ApiColumn {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct ApiCard {
    note: Option<String>,
    content_url: Option<String>,
}

#[derive(Deserialize)]
struct ApiTitled {
    title: String,
}

#[derive(Deserialize)]
struct ApiComment {
    user: Option<ApiUser>,
    body: Option<String>,
}

#![allow(dead_code)]

use async_trait::async_trait;
use devagent::clients::github::{
    CodeHit, CodeHost, IssueDetail, IssueState, IssueSummary, ProjectBoard, ProjectColumn,
    PullSummary, RepoDetails,
};
use devagent::clients::local_repo::LocalRepo;
use devagent::clients::model::LanguageModel;
use devagent::clients::parser::TreeSitterParser;
use devagent::context::ContextEnricher;
use devagent::embedding::hashed::HashedEmbeddingProvider;
use devagent::error::{CodeHostError, ModelError};
use devagent::memory::MemoryStore;
use devagent::tools::dispatch::Dispatcher;
use devagent::tools::{build_registry, Collaborators};
use git2::{Repository, Signature};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Memory store over a fresh in-memory database.
pub fn memory_store() -> MemoryStore {
    let conn = devagent::db::open_memory_database().unwrap();
    MemoryStore::new(
        Arc::new(Mutex::new(conn)),
        Arc::new(HashedEmbeddingProvider::new()),
    )
}

/// Code host serving one repository `octocat/hello-world` with issue #1 and
/// organization `my-org` with project 42 (columns of 3 and 7 cards).
#[derive(Default)]
pub struct FakeHost {
    /// When set, every call fails with this API error.
    pub fail_with: Option<u16>,
}

impl FakeHost {
    fn check(&self) -> Result<(), CodeHostError> {
        match self.fail_with {
            Some(status) => Err(CodeHostError::Api {
                status,
                message: "Bad credentials".into(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CodeHost for FakeHost {
    async fn get_repo(&self, repo: &str) -> Result<RepoDetails, CodeHostError> {
        self.check()?;
        Ok(RepoDetails {
            name: repo.rsplit('/').next().unwrap_or(repo).to_string(),
            description: Some("My first repository".into()),
            stars: 10,
            forks: 2,
            open_issues: 1,
            language: Some("Rust".into()),
            topics: vec!["demo".into()],
        })
    }

    async fn issues(
        &self,
        _repo: &str,
        state: IssueState,
    ) -> Result<Vec<IssueSummary>, CodeHostError> {
        self.check()?;
        Ok(vec![IssueSummary {
            number: 1,
            title: "Found a bug".into(),
            state: state.as_str().into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            labels: vec!["bug".into()],
        }])
    }

    async fn pulls(
        &self,
        _repo: &str,
        _state: IssueState,
    ) -> Result<Vec<PullSummary>, CodeHostError> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn search_code(
        &self,
        query: &str,
        _language: Option<&str>,
    ) -> Result<Vec<CodeHit>, CodeHostError> {
        self.check()?;
        Ok(vec![CodeHit {
            path: "src/lib.rs".into(),
            repository: "octocat/hello-world".into(),
            url: "https://github.com/octocat/hello-world/blob/main/src/lib.rs".into(),
            snippet: format!("// {query}"),
        }])
    }

    async fn project(&self, org: &str, number: u64) -> Result<ProjectBoard, CodeHostError> {
        self.check()?;
        if org != "my-org" || number != 42 {
            return Err(CodeHostError::NotFound(format!("Project #{number} in {org}")));
        }
        Ok(ProjectBoard {
            name: "Roadmap".into(),
            number,
            body: None,
            state: "open".into(),
            columns: vec![
                ProjectColumn {
                    name: "To do".into(),
                    total_cards: 3,
                    cards: (1..=3).map(|i| format!("task {i}")).collect(),
                },
                ProjectColumn {
                    name: "Done".into(),
                    total_cards: 7,
                    cards: (1..=5).map(|i| format!("shipped {i}")).collect(),
                },
            ],
        })
    }

    async fn get_issue(&self, repo: &str, number: u64) -> Result<IssueDetail, CodeHostError> {
        self.check()?;
        if number != 1 {
            return Err(CodeHostError::NotFound(format!("Issue #{number}")));
        }
        Ok(IssueDetail {
            number,
            title: format!("Found a bug in {repo}"),
            state: "open".into(),
            author: "octocat".into(),
            body: Some("It crashes on start.".into()),
            comments: Vec::new(),
        })
    }
}

/// Model that answers with a fixed text and records the prompts it saw.
#[derive(Default)]
pub struct FakeModel {
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl LanguageModel for FakeModel {
    fn name(&self) -> &str {
        "fake-model"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(ModelError::Network("connection refused".into()));
        }
        Ok("The app crashes on start; no fix yet.".into())
    }
}

/// Dispatcher with every tool registered over fakes, rooted at `workdir`.
pub fn dispatcher_with(host: FakeHost, model: FakeModel, workdir: &Path) -> Dispatcher {
    let repo = LocalRepo::new(workdir, Duration::from_secs(10));
    let enricher = ContextEnricher::new(repo.clone());
    let memory = memory_store();
    let collaborators = Collaborators {
        repo,
        host: Arc::new(host),
        model: Arc::new(model),
        parser: Arc::new(TreeSitterParser),
        docs_path: workdir.join("docs/api_reference.md"),
    };
    let registry = build_registry(&collaborators, &memory, &enricher).unwrap();
    Dispatcher::new(registry, memory, enricher)
}

pub fn test_dispatcher(workdir: &Path) -> Dispatcher {
    dispatcher_with(FakeHost::default(), FakeModel::default(), workdir)
}

/// Write `name` and commit it on HEAD.
pub fn commit_file(repo: &Repository, name: &str, contents: &str, message: &str) {
    let root = repo.workdir().unwrap().to_path_buf();
    std::fs::write(root.join(name), contents).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Ada", "ada@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

/// A repository in `dir` with `commits` commits touching `a.txt`.
pub fn repo_with_commits(dir: &Path, commits: usize) -> Repository {
    let repo = Repository::init(dir).unwrap();
    for i in 1..=commits {
        commit_file(&repo, "a.txt", &format!("{i}\n"), &format!("commit {i}"));
    }
    repo
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

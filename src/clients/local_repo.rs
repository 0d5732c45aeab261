//! Local working copy introspection via `git2`.
//!
//! Every call re-opens the repository with `Repository::discover`, so results
//! always reflect the current state of the working directory. The blocking
//! libgit2 work runs on the tokio blocking pool under a deadline.

use git2::{DiffFormat, DiffOptions, Repository, Sort, Status, StatusOptions};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::RepoError;

/// Summary of the working copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoInfo {
    pub branch: String,
    /// 7-character short id of HEAD, `None` on an unborn branch.
    pub last_commit: Option<String>,
    pub author: Option<String>,
    pub remotes: Vec<String>,
    pub untracked: usize,
    pub modified: usize,
    pub staged: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Modified,
    Staged,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Staged => "staged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    pub path: String,
    pub status: DiffStatus,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub short_id: String,
    pub author: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LocalRepo {
    root: PathBuf,
    timeout: Duration,
}

impl LocalRepo {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            root: root.into(),
            timeout,
        }
    }

    pub async fn info(&self) -> Result<RepoInfo, RepoError> {
        self.run(|repo| read_info(&repo)).await
    }

    /// Unstaged diffs first, then staged ones.
    pub async fn diffs(&self) -> Result<Vec<FileDiff>, RepoError> {
        self.run(|repo| read_diffs(&repo)).await
    }

    /// Newest-first commits reachable from HEAD.
    pub async fn history(&self, limit: usize) -> Result<Vec<CommitSummary>, RepoError> {
        self.run(move |repo| read_history(&repo, limit)).await
    }

    async fn run<T, F>(&self, f: F) -> Result<T, RepoError>
    where
        T: Send + 'static,
        F: FnOnce(Repository) -> Result<T, RepoError> + Send + 'static,
    {
        let root = self.root.clone();
        let task = tokio::task::spawn_blocking(move || {
            let repo = Repository::discover(&root).map_err(|_| RepoError::NotARepository)?;
            f(repo)
        });
        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined.map_err(|e| RepoError::Git(format!("git task failed: {e}")))?,
            Err(_) => Err(RepoError::Timeout(self.timeout.as_secs())),
        }
    }
}

fn short_id(oid: git2::Oid) -> String {
    oid.to_string()[..7].to_string()
}

fn read_info(repo: &Repository) -> Result<RepoInfo, RepoError> {
    let (branch, head_commit) = match repo.head() {
        Ok(head) => {
            let branch = if head.is_branch() {
                head.shorthand().unwrap_or("HEAD").to_string()
            } else {
                "HEAD (detached)".to_string()
            };
            (branch, head.peel_to_commit().ok())
        }
        // Unborn branch: HEAD names a branch with no commits yet.
        Err(_) => {
            let branch = repo
                .find_reference("HEAD")
                .ok()
                .and_then(|r| r.symbolic_target().map(str::to_string))
                .map(|t| t.trim_start_matches("refs/heads/").to_string())
                .unwrap_or_else(|| "unknown".into());
            (branch, None)
        }
    };

    let remotes = repo
        .remotes()?
        .iter()
        .flatten()
        .filter_map(|name| repo.find_remote(name).ok())
        .filter_map(|remote| remote.url().map(str::to_string))
        .collect();

    let mut opts = StatusOptions::new();
    opts.include_untracked(true).recurse_untracked_dirs(true);
    let statuses = repo.statuses(Some(&mut opts))?;

    let worktree_changed = Status::WT_MODIFIED | Status::WT_DELETED | Status::WT_TYPECHANGE | Status::WT_RENAMED;
    let index_changed = Status::INDEX_NEW
        | Status::INDEX_MODIFIED
        | Status::INDEX_DELETED
        | Status::INDEX_RENAMED
        | Status::INDEX_TYPECHANGE;

    let mut info = RepoInfo {
        branch,
        last_commit: head_commit.as_ref().map(|c| short_id(c.id())),
        author: head_commit
            .as_ref()
            .map(|c| c.author().name().unwrap_or("unknown").to_string()),
        remotes,
        ..Default::default()
    };

    for entry in statuses.iter() {
        let status = entry.status();
        if status.contains(Status::WT_NEW) {
            info.untracked += 1;
        }
        if status.intersects(worktree_changed) {
            info.modified += 1;
        }
        if status.intersects(index_changed) {
            info.staged += 1;
        }
    }

    Ok(info)
}

fn read_diffs(repo: &Repository) -> Result<Vec<FileDiff>, RepoError> {
    let mut out = Vec::new();

    let mut opts = DiffOptions::new();
    let unstaged = repo.diff_index_to_workdir(None, Some(&mut opts))?;
    collect_patches(&unstaged, DiffStatus::Modified, &mut out)?;

    let head_tree = repo.head().ok().and_then(|h| h.peel_to_tree().ok());
    let mut opts = DiffOptions::new();
    let staged = repo.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))?;
    collect_patches(&staged, DiffStatus::Staged, &mut out)?;

    Ok(out)
}

fn collect_patches(
    diff: &git2::Diff<'_>,
    status: DiffStatus,
    out: &mut Vec<FileDiff>,
) -> Result<(), RepoError> {
    let start = out.len();
    diff.print(DiffFormat::Patch, |delta, _hunk, line| {
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let idx = match out[start..].iter().position(|d| d.path == path) {
            Some(i) => start + i,
            None => {
                out.push(FileDiff {
                    path,
                    status,
                    body: String::new(),
                });
                out.len() - 1
            }
        };

        // File headers are implied by the path; keep hunk headers and lines.
        match line.origin() {
            '+' | '-' | ' ' => out[idx].body.push(line.origin()),
            'F' => return true,
            _ => {}
        }
        out[idx].body.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;
    Ok(())
}

fn read_history(repo: &Repository, limit: usize) -> Result<Vec<CommitSummary>, RepoError> {
    let mut walk = repo.revwalk()?;
    // Changing the sort mode resets the walker, so it goes first.
    walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    if walk.push_head().is_err() {
        return Ok(Vec::new());
    }

    let mut commits = Vec::new();
    for oid in walk.take(limit) {
        let commit = repo.find_commit(oid?)?;
        commits.push(CommitSummary {
            short_id: short_id(commit.id()),
            author: commit.author().name().unwrap_or("unknown").to_string(),
            message: commit.message().unwrap_or("").trim_end().to_string(),
        });
    }
    Ok(commits)
}

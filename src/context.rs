//! Context Enricher: point-in-time snapshot of the local working copy, used
//! to tag outbound memory writes and to draw the front-end status line.

use serde::Serialize;

use crate::clients::local_repo::LocalRepo;
use crate::error::RepoError;
use crate::memory::types::{GitContext, Metadata};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoSnapshot {
    pub branch: String,
    pub last_commit: Option<String>,
    pub modified: usize,
    pub staged: usize,
    pub untracked: usize,
    pub remotes: Vec<String>,
}

impl RepoSnapshot {
    /// The empty sentinel: the working directory is not inside a repository.
    pub fn is_empty(&self) -> bool {
        self.branch.is_empty()
    }

    /// Modified plus staged paths.
    pub fn dirty_count(&self) -> usize {
        self.modified + self.staged
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_count() > 0
    }

    pub fn to_git_context(&self) -> Option<GitContext> {
        if self.is_empty() {
            return None;
        }
        Some(GitContext {
            branch: Some(self.branch.clone()),
            last_commit: self.last_commit.clone(),
            modified: self.modified,
            staged: self.staged,
        })
    }

    /// `branch` and `commit` keys for auto-memory metadata. Empty for the sentinel.
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        if !self.is_empty() {
            metadata.insert("branch".into(), self.branch.clone().into());
            if let Some(commit) = &self.last_commit {
                metadata.insert("commit".into(), commit.clone().into());
            }
        }
        metadata
    }
}

#[derive(Debug, Clone)]
pub struct ContextEnricher {
    repo: LocalRepo,
}

impl ContextEnricher {
    pub fn new(repo: LocalRepo) -> Self {
        Self { repo }
    }

    /// Never cached; every call re-reads the working copy.
    pub async fn snapshot(&self) -> RepoSnapshot {
        match self.repo.info().await {
            Ok(info) => RepoSnapshot {
                branch: info.branch,
                last_commit: info.last_commit,
                modified: info.modified,
                staged: info.staged,
                untracked: info.untracked,
                remotes: info.remotes,
            },
            Err(RepoError::NotARepository) => RepoSnapshot::default(),
            Err(e) => {
                tracing::warn!(error = %e, "repository snapshot failed");
                RepoSnapshot::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn outside_a_repository_is_the_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let enricher = ContextEnricher::new(LocalRepo::new(dir.path(), Duration::from_secs(5)));
        let snapshot = enricher.snapshot().await;
        assert!(snapshot.is_empty());
        assert!(snapshot.to_git_context().is_none());
        assert!(snapshot.metadata().is_empty());
    }

    #[tokio::test]
    async fn unborn_repository_has_branch_but_no_commit() {
        let dir = tempfile::tempdir().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("x.txt"), "x").unwrap();

        let enricher = ContextEnricher::new(LocalRepo::new(dir.path(), Duration::from_secs(5)));
        let snapshot = enricher.snapshot().await;
        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.last_commit, None);
        assert_eq!(snapshot.untracked, 1);
        assert!(!snapshot.is_dirty());
        assert!(snapshot.metadata().contains_key("branch"));
        assert!(!snapshot.metadata().contains_key("commit"));
    }

    #[test]
    fn git_context_carries_counts() {
        let snapshot = RepoSnapshot {
            branch: "main".into(),
            last_commit: Some("abc1234".into()),
            modified: 2,
            staged: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.dirty_count(), 3);
        let git = snapshot.to_git_context().unwrap();
        assert_eq!(git.branch.as_deref(), Some("main"));
        assert_eq!(git.modified + git.staged, 3);
    }
}

//! Memory Store: text plus metadata, retrieved by similarity and an optional
//! context-type filter.
//!
//! [`MemoryStore`] is the only shared mutable component. It serializes access
//! to the SQLite connection behind a mutex and runs the blocking work on the
//! tokio blocking pool, so interleaved `add` and `query` calls are safe.

pub mod store;
pub mod types;

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::embedding::EmbeddingProvider;
use types::{content_prefix, ContextType, GitContext, MemoryRecord, Metadata};

/// Maximum number of neighbours returned by a query.
pub const DEFAULT_MAX_RESULTS: usize = 3;

const NO_MEMORY: &str = "No memory found.";

#[derive(Clone)]
pub struct MemoryStore {
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    max_results: usize,
}

impl MemoryStore {
    pub fn new(db: Arc<Mutex<Connection>>, embedding: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            db,
            embedding,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Write `content` under `context_type`. `timestamp` and `context_type`
    /// always overwrite caller-supplied keys of the same name.
    pub async fn add(
        &self,
        content: &str,
        context_type: ContextType,
        metadata: Metadata,
    ) -> Result<String> {
        anyhow::ensure!(!content.trim().is_empty(), "content must not be empty");

        let mut metadata = metadata;
        metadata.insert(
            "timestamp".into(),
            chrono::Utc::now().to_rfc3339().into(),
        );
        metadata.insert("context_type".into(), context_type.as_str().into());

        let embedding = self.embed(content).await?;
        let db = Arc::clone(&self.db);
        let content_owned = content.to_string();
        let outcome = tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|e| anyhow!("db lock poisoned: {e}"))?;
            store::insert_memory(&conn, &content_owned, context_type, &metadata, &embedding)
        })
        .await
        .map_err(|e| anyhow!("db task failed: {e}"))??;

        tracing::info!(
            id = %outcome.id,
            context_type = %context_type,
            created = outcome.created,
            "memory stored"
        );

        Ok(format!(
            "Memory added [{context_type}]: {}...",
            content_prefix(content, 100)
        ))
    }

    /// Repository-scoped write carrying branch, commit and files changed on
    /// top of `metadata`.
    pub async fn add_repo(
        &self,
        content: &str,
        git: &GitContext,
        metadata: Metadata,
    ) -> Result<String> {
        let mut metadata = metadata;
        metadata.insert(
            "branch".into(),
            git.branch.clone().unwrap_or_else(|| "unknown".into()).into(),
        );
        metadata.insert(
            "commit".into(),
            git.last_commit.clone().unwrap_or_else(|| "unknown".into()).into(),
        );
        metadata.insert("files_changed".into(), (git.modified + git.staged).into());
        self.add(content, ContextType::Repository, metadata).await
    }

    /// Up to `max_results` nearest records.
    pub async fn search(
        &self,
        text: &str,
        context_type: Option<ContextType>,
    ) -> Result<Vec<MemoryRecord>> {
        let embedding = self.embed(text).await?;
        let db = Arc::clone(&self.db);
        let limit = self.max_results;
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|e| anyhow!("db lock poisoned: {e}"))?;
            store::search(&conn, &embedding, context_type, limit)
        })
        .await
        .map_err(|e| anyhow!("db task failed: {e}"))?
    }

    /// Rendered query: one `[context_type — timestamp] content` entry per hit.
    pub async fn query(&self, text: &str, context_type: Option<ContextType>) -> Result<String> {
        let records = self.search(text, context_type).await?;
        tracing::debug!(hits = records.len(), filter = ?context_type, "memory query");
        if records.is_empty() {
            return Ok(NO_MEMORY.into());
        }
        Ok(records
            .iter()
            .map(MemoryRecord::render)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    pub async fn query_repo(&self, text: &str) -> Result<String> {
        self.query(text, Some(ContextType::Repository)).await
    }

    /// Number of stored records, optionally for one context type.
    pub async fn count(&self, context_type: Option<ContextType>) -> Result<usize> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|e| anyhow!("db lock poisoned: {e}"))?;
            store::count_memories(&conn, context_type)
        })
        .await
        .map_err(|e| anyhow!("db task failed: {e}"))?
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let provider = Arc::clone(&self.embedding);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || provider.embed(&text))
            .await
            .map_err(|e| anyhow!("embedding task failed: {e}"))?
    }
}

//! Memory tools: general and repository-scoped writes and queries.

use async_trait::async_trait;

use super::params::{ParamKind, ParamSpec, ToolArgs};
use super::registry::{RetryPolicy, ToolDescriptor, ToolHandler};
use crate::context::ContextEnricher;
use crate::error::ToolFailure;
use crate::memory::types::{ContextType, Metadata};
use crate::memory::MemoryStore;

const CONTEXT_TYPE: ParamSpec = ParamSpec::new(
    "context_type",
    ParamKind::Optional(&ParamKind::Enum(ContextType::NAMES)),
    "Context tag (default: general for writes, no filter for queries)",
);

fn context_type(args: &ToolArgs) -> Result<Option<ContextType>, ToolFailure> {
    args.get_str("context_type")
        .map(|s| s.parse::<ContextType>())
        .transpose()
        .map_err(|e| ToolFailure::new("reading context type", e))
}

pub fn descriptors(store: &MemoryStore, enricher: &ContextEnricher) -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "add_memory",
            "Store a note in the agent's memory, tagged with a context type.",
            AddMemory {
                store: store.clone(),
            },
        )
        .param(ParamSpec::new("content", ParamKind::String, "Text to remember"))
        .param(CONTEXT_TYPE),
        ToolDescriptor::new(
            "get_memory",
            "Retrieve up to three stored notes most similar to the query, optionally filtered by context type.",
            GetMemory {
                store: store.clone(),
            },
        )
        .param(ParamSpec::new("query", ParamKind::String, "Search text"))
        .param(CONTEXT_TYPE)
        .retry(RetryPolicy::Idempotent),
        ToolDescriptor::new(
            "add_repo_memory",
            "Store a note about the current repository, tagged with branch, commit and changed file count.",
            AddRepoMemory {
                store: store.clone(),
                enricher: enricher.clone(),
            },
        )
        .param(ParamSpec::new("content", ParamKind::String, "Text to remember")),
        ToolDescriptor::new(
            "get_repo_memory",
            "Retrieve repository-scoped notes most similar to the query.",
            GetRepoMemory {
                store: store.clone(),
            },
        )
        .param(ParamSpec::new("query", ParamKind::String, "Search text"))
        .retry(RetryPolicy::Idempotent),
    ]
}

struct AddMemory {
    store: MemoryStore,
}

#[async_trait]
impl ToolHandler for AddMemory {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        let context_type = context_type(&args)?.unwrap_or(ContextType::General);
        self.store
            .add(args.str("content"), context_type, Metadata::new())
            .await
            .map_err(|e| ToolFailure::new("adding memory", e))
    }
}

struct GetMemory {
    store: MemoryStore,
}

#[async_trait]
impl ToolHandler for GetMemory {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        self.store
            .query(args.str("query"), context_type(&args)?)
            .await
            .map_err(|e| ToolFailure::new("querying memory", e))
    }
}

struct AddRepoMemory {
    store: MemoryStore,
    enricher: ContextEnricher,
}

#[async_trait]
impl ToolHandler for AddRepoMemory {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        let git = self
            .enricher
            .snapshot()
            .await
            .to_git_context()
            .unwrap_or_default();
        self.store
            .add_repo(args.str("content"), &git, Metadata::new())
            .await
            .map_err(|e| ToolFailure::new("adding repository memory", e))
    }
}

struct GetRepoMemory {
    store: MemoryStore,
}

#[async_trait]
impl ToolHandler for GetRepoMemory {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        self.store
            .query_repo(args.str("query"))
            .await
            .map_err(|e| ToolFailure::new("querying repository memory", e))
    }
}

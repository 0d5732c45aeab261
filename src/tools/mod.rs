//! Tool Registry & Dispatcher, plus every tool the agent exposes.
//!
//! Tools are typed descriptors ([`registry::ToolDescriptor`]) whose handlers
//! close over the collaborators they need. [`build_registry`] registers all of
//! them in a fixed order, which is the order the endpoint advertises and the
//! front end's help lists.

pub mod code;
pub mod dispatch;
pub mod docs;
pub mod git;
pub mod github;
pub mod memory;
pub mod params;
pub mod registry;

use std::path::PathBuf;
use std::sync::Arc;

use crate::clients::github::CodeHost;
use crate::clients::local_repo::LocalRepo;
use crate::clients::model::LanguageModel;
use crate::clients::parser::CodeParser;
use crate::context::ContextEnricher;
use crate::error::DispatchError;
use crate::memory::MemoryStore;
use registry::Registry;

/// Collaborator handles injected into tool handlers.
#[derive(Clone)]
pub struct Collaborators {
    pub repo: LocalRepo,
    pub host: Arc<dyn CodeHost>,
    pub model: Arc<dyn LanguageModel>,
    pub parser: Arc<dyn CodeParser>,
    pub docs_path: PathBuf,
}

pub fn build_registry(
    collaborators: &Collaborators,
    memory: &MemoryStore,
    enricher: &ContextEnricher,
) -> Result<Registry, DispatchError> {
    let mut registry = Registry::new();

    let descriptors = memory::descriptors(memory, enricher)
        .into_iter()
        .chain(docs::descriptors(
            collaborators.docs_path.clone(),
            Arc::clone(&collaborators.model),
        ))
        .chain(git::descriptors(&collaborators.repo))
        .chain(github::descriptors(
            Arc::clone(&collaborators.host),
            Arc::clone(&collaborators.model),
        ))
        .chain(code::descriptors(Arc::clone(&collaborators.parser)));

    for descriptor in descriptors {
        registry.register(descriptor)?;
    }

    tracing::debug!(tools = registry.len(), "tool registry built");
    Ok(registry)
}

//! Builds every long-lived component once and wires them together.
//!
//! Nothing here is global: the memory store, collaborators and registry are
//! values owned by [`Services`] and shared with the endpoint and the front
//! end through `Arc`.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clients::github::GithubClient;
use crate::clients::local_repo::LocalRepo;
use crate::clients::model::OpenAiCompatModel;
use crate::clients::parser::TreeSitterParser;
use crate::config::AgentConfig;
use crate::context::ContextEnricher;
use crate::db;
use crate::embedding;
use crate::error::StartupError;
use crate::memory::MemoryStore;
use crate::tools::dispatch::Dispatcher;
use crate::tools::{build_registry, Collaborators};

pub struct Services {
    pub config: Arc<AgentConfig>,
    pub dispatcher: Arc<Dispatcher>,
    pub workdir: PathBuf,
    /// Model identifier shown in the front-end banner.
    pub model_name: String,
}

/// The interactive front end only runs inside a git working copy.
pub fn require_working_copy(dir: &Path) -> Result<(), StartupError> {
    git2::Repository::discover(dir)
        .map(|_| ())
        .map_err(|_| StartupError::NotAWorkingCopy(dir.display().to_string()))
}

/// Read a credential once. Empty values count as absent.
fn secret_from_env(key: &str) -> Option<SecretString> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

/// Open the memory database and embedding provider, warning when the stored
/// vectors were produced by a different provider.
fn open_memory(config: &AgentConfig) -> Result<MemoryStore> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let provider = embedding::create_provider(&config.embedding)?;
    match db::schema::get_embedding_model(&conn)? {
        Some(stored) if stored != provider.id() => {
            tracing::warn!(
                stored = %stored,
                configured = %provider.id(),
                "embedding provider changed; existing memories will rank poorly"
            );
        }
        Some(_) => {}
        None => db::schema::set_embedding_model(&conn, provider.id())?,
    }
    tracing::info!(provider = provider.id(), "embedding provider ready");

    let embedding: Arc<dyn embedding::EmbeddingProvider> = Arc::from(provider);
    Ok(MemoryStore::new(Arc::new(Mutex::new(conn)), embedding)
        .with_max_results(config.memory.max_results))
}

pub fn build(config: AgentConfig) -> Result<Services> {
    let workdir = std::env::current_dir().context("failed to read working directory")?;
    let memory = open_memory(&config)?;

    let repo = LocalRepo::new(&workdir, Duration::from_secs(config.git.timeout_secs));
    let enricher = ContextEnricher::new(repo.clone());

    let host = GithubClient::new(
        &config.github.api_url,
        secret_from_env(&config.github.token_env),
        Duration::from_secs(config.github.timeout_secs),
    )
    .context("failed to build GitHub client")?;
    let model = OpenAiCompatModel::new(
        &config.model.base_url,
        &config.model.model,
        secret_from_env(&config.model.api_key_env),
        Duration::from_secs(config.model.timeout_secs),
    )
    .context("failed to build model client")?;

    let collaborators = Collaborators {
        repo,
        host: Arc::new(host),
        model: Arc::new(model),
        parser: Arc::new(TreeSitterParser),
        docs_path: workdir.join(&config.docs.path),
    };
    let registry = build_registry(&collaborators, &memory, &enricher)
        .context("failed to register tools")?;
    tracing::info!(tools = registry.len(), workdir = %workdir.display(), "services ready");

    Ok(Services {
        model_name: config.model.model.clone(),
        config: Arc::new(config),
        dispatcher: Arc::new(Dispatcher::new(registry, memory, enricher)),
        workdir,
    })
}

mod helpers;

use devagent::db::{self, schema};
use devagent::embedding::hashed::HashedEmbeddingProvider;
use devagent::embedding::EmbeddingProvider;
use devagent::memory::types::{ContextType, GitContext, Metadata};
use devagent::memory::MemoryStore;
use helpers::memory_store;
use std::sync::{Arc, Mutex};

fn file_store(path: &std::path::Path) -> MemoryStore {
    let conn = db::open_database(path).unwrap();
    MemoryStore::new(
        Arc::new(Mutex::new(conn)),
        Arc::new(HashedEmbeddingProvider::new()),
    )
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/memory.db");

    {
        let store = file_store(&path);
        store
            .add("deploys run from the release branch", ContextType::General, Metadata::new())
            .await
            .unwrap();
    }

    let store = file_store(&path);
    assert_eq!(store.count(None).await.unwrap(), 1);
    let found = store.query("release branch", None).await.unwrap();
    assert!(found.contains("deploys run from the release branch"));
}

#[test]
fn embedding_model_is_recorded_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.db");
    let provider = HashedEmbeddingProvider::new();

    let conn = db::open_database(&path).unwrap();
    assert_eq!(schema::get_embedding_model(&conn).unwrap(), None);
    schema::set_embedding_model(&conn, provider.id()).unwrap();
    drop(conn);

    let conn = db::open_database(&path).unwrap();
    assert_eq!(
        schema::get_embedding_model(&conn).unwrap().as_deref(),
        Some(provider.id())
    );
}

#[tokio::test]
async fn repeated_add_keeps_one_record() {
    let store = memory_store();
    for _ in 0..3 {
        store
            .add("same note", ContextType::General, Metadata::new())
            .await
            .unwrap();
    }
    store
        .add("same note", ContextType::IssueSummary, Metadata::new())
        .await
        .unwrap();

    assert_eq!(store.count(Some(ContextType::General)).await.unwrap(), 1);
    assert_eq!(store.count(None).await.unwrap(), 2);
}

#[tokio::test]
async fn empty_content_is_rejected() {
    let store = memory_store();
    assert!(store
        .add("   ", ContextType::General, Metadata::new())
        .await
        .is_err());
    assert_eq!(store.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn reserved_metadata_keys_are_overwritten() {
    let store = memory_store();
    let mut metadata = Metadata::new();
    metadata.insert("context_type".into(), "general".into());
    metadata.insert("timestamp".into(), "yesterday".into());
    metadata.insert("origin".into(), "test".into());

    store
        .add("tagged note", ContextType::GithubProject, metadata)
        .await
        .unwrap();

    let records = store.search("tagged note", None).await.unwrap();
    let metadata = &records[0].metadata;
    assert_eq!(metadata["context_type"], "github_project");
    assert_ne!(metadata["timestamp"], "yesterday");
    assert_eq!(metadata["origin"], "test");
}

#[tokio::test]
async fn results_are_capped_and_filtered() {
    let store = memory_store().with_max_results(2);
    for i in 0..5 {
        store
            .add(&format!("cache note {i}"), ContextType::General, Metadata::new())
            .await
            .unwrap();
    }
    store
        .add("cache note for the repo", ContextType::Repository, Metadata::new())
        .await
        .unwrap();

    assert_eq!(store.search("cache note", None).await.unwrap().len(), 2);
    let repo_only = store
        .search("cache note", Some(ContextType::Repository))
        .await
        .unwrap();
    assert_eq!(repo_only.len(), 1);
    assert_eq!(repo_only[0].context_type, ContextType::Repository);
}

#[tokio::test]
async fn repo_writes_carry_git_fields() {
    let store = memory_store();
    let git = GitContext {
        branch: Some("main".into()),
        last_commit: Some("abc1234".into()),
        modified: 2,
        staged: 1,
    };

    let reply = store
        .add_repo("parser refactor in progress", &git, Metadata::new())
        .await
        .unwrap();
    assert_eq!(reply, "Memory added [repository]: parser refactor in progress...");

    let records = store
        .search("parser", Some(ContextType::Repository))
        .await
        .unwrap();
    let metadata = &records[0].metadata;
    assert_eq!(metadata["branch"], "main");
    assert_eq!(metadata["commit"], "abc1234");
    assert_eq!(metadata["files_changed"], 3);
}

#[tokio::test]
async fn concurrent_writers_and_readers() {
    let store = Arc::new(memory_store());
    let mut tasks = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store
                .add(&format!("parallel note {i}"), ContextType::General, Metadata::new())
                .await
                .unwrap();
            store.query("parallel", None).await.unwrap()
        }));
    }
    for task in tasks {
        assert_ne!(task.await.unwrap(), "No memory found.");
    }
    assert_eq!(store.count(None).await.unwrap(), 16);
}

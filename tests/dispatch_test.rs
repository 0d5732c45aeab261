mod helpers;

use devagent::error::DispatchError;
use devagent::memory::types::ContextType;
use devagent::tools::dispatch::Originator;
use helpers::{dispatcher_with, repo_with_commits, test_dispatcher, FakeHost, FakeModel};
use serde_json::{json, Map, Value};

fn params(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

const ALL_TOOLS: &[&str] = &[
    "add_memory",
    "get_memory",
    "add_repo_memory",
    "get_repo_memory",
    "search_docs",
    "get_commit_history",
    "get_issues",
    "get_repo_info",
    "get_diffs",
    "get_repo_details",
    "get_repository_issues",
    "get_pull_requests",
    "search_github_code",
    "get_project_info",
    "summarize_issue",
    "analyze_file_content",
];

#[tokio::test]
async fn registry_lists_every_tool_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = test_dispatcher(dir.path());
    let names: Vec<_> = dispatcher.registry().list().iter().map(|d| d.name).collect();
    assert_eq!(names, ALL_TOOLS);
}

#[tokio::test]
async fn every_listed_tool_is_dispatchable() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = test_dispatcher(dir.path());
    for descriptor in dispatcher.registry().list() {
        // Missing required arguments are rejected by the dispatcher, which
        // proves the name resolved to a descriptor.
        match dispatcher
            .invoke(descriptor.name, Map::new(), Originator::Endpoint)
            .await
        {
            Ok(_) | Err(DispatchError::BadArgument { .. }) => {}
            Err(e) => panic!("{}: unexpected {e}", descriptor.name),
        }
    }
}

#[tokio::test]
async fn zero_commit_limit_returns_newest_commit() {
    let dir = tempfile::tempdir().unwrap();
    repo_with_commits(dir.path(), 2);
    let dispatcher = test_dispatcher(dir.path());

    let output = dispatcher
        .invoke("get_commit_history", params(json!({"limit": 0})), Originator::Endpoint)
        .await
        .unwrap();
    assert!(!output.is_error);
    assert_eq!(output.text.matches("Commit: ").count(), 1);
    assert!(output.text.ends_with("Message: commit 2"));
}

#[tokio::test]
async fn unknown_tool_has_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = test_dispatcher(dir.path());

    let err = dispatcher
        .invoke("drop_database", params(json!({"content": "x"})), Originator::Endpoint)
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::UnknownTool("drop_database".into()));
    assert_eq!(dispatcher.memory().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn bad_argument_names_parameter_and_skips_handler() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = test_dispatcher(dir.path());

    let err = dispatcher
        .invoke(
            "add_memory",
            params(json!({"content": "note", "context_type": "scratch"})),
            Originator::Endpoint,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::BadArgument { ref name, .. } if name == "context_type"));

    let err = dispatcher
        .invoke(
            "summarize_issue",
            params(json!({"repo": "octocat/hello-world", "issue_number": "one"})),
            Originator::Endpoint,
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::bad_argument("issue_number", "non-negative integer")
    );
    assert_eq!(dispatcher.memory().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_issue_is_reported_and_not_remembered() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = test_dispatcher(dir.path());

    let out = dispatcher
        .invoke_command(
            "summarize_issue",
            params(json!({"repo": "octocat/hello-world", "issue_number": 999999})),
            "/github summarize octocat/hello-world 999999",
        )
        .await
        .unwrap();
    assert!(out.is_error);
    assert!(out.text.starts_with("Issue #999999 not found"));
    assert_eq!(dispatcher.memory().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn summary_is_remembered_with_issue_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = test_dispatcher(dir.path());

    let out = dispatcher
        .invoke(
            "summarize_issue",
            params(json!({"repo": "octocat/hello-world", "issue_number": 1})),
            Originator::Endpoint,
        )
        .await
        .unwrap();
    assert!(!out.is_error);
    assert!(out.text.starts_with("Issue #1 (octocat/hello-world) summary:\n"));

    let memory = dispatcher.memory();
    assert_eq!(memory.count(Some(ContextType::IssueSummary)).await.unwrap(), 1);
    let records = memory
        .search("crashes on start", Some(ContextType::IssueSummary))
        .await
        .unwrap();
    let metadata = &records[0].metadata;
    assert_eq!(metadata["repo"], "octocat/hello-world");
    assert_eq!(metadata["issue_number"], 1);
    assert_eq!(metadata["context_type"], "issue_summary");
    assert!(metadata["command"].as_str().unwrap().starts_with("summarize_issue "));
    assert!(metadata["timestamp"].is_string());
}

#[tokio::test]
async fn model_failure_is_not_remembered() {
    let dir = tempfile::tempdir().unwrap();
    let model = FakeModel {
        fail: true,
        ..Default::default()
    };
    let dispatcher = dispatcher_with(FakeHost::default(), model, dir.path());

    let out = dispatcher
        .invoke(
            "summarize_issue",
            params(json!({"repo": "octocat/hello-world", "issue_number": 1})),
            Originator::Endpoint,
        )
        .await
        .unwrap();
    assert!(out.is_error);
    assert!(out.text.starts_with("Error generating summary"));
    assert_eq!(dispatcher.memory().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn project_board_is_rendered_and_remembered() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = test_dispatcher(dir.path());

    let out = dispatcher
        .invoke_command(
            "get_project_info",
            params(json!({"org": "my-org", "number": 42})),
            "/github project my-org 42",
        )
        .await
        .unwrap();
    assert!(!out.is_error);
    assert!(out.text.contains("Column: To do (3 cards)"));
    assert!(out.text.contains("Column: Done (7 cards)"));
    let done = out.text.split("Column: Done").nth(1).unwrap();
    for i in 1..=5 {
        assert!(done.contains(&format!("- shipped {i}")));
    }
    assert!(done.trim_end().ends_with("… 2 more"));

    let memory = dispatcher.memory();
    assert_eq!(memory.count(Some(ContextType::GithubProject)).await.unwrap(), 1);
    let records = memory
        .search("Roadmap", Some(ContextType::GithubProject))
        .await
        .unwrap();
    assert_eq!(records[0].content, out.text);
    assert_eq!(records[0].metadata["command"], "/github project my-org 42");
}

#[tokio::test]
async fn host_errors_become_error_strings() {
    let dir = tempfile::tempdir().unwrap();
    let host = FakeHost {
        fail_with: Some(401),
    };
    let dispatcher = dispatcher_with(host, FakeModel::default(), dir.path());

    let out = dispatcher
        .invoke(
            "get_project_info",
            params(json!({"org": "my-org", "number": 42})),
            Originator::Endpoint,
        )
        .await
        .unwrap();
    assert!(out.is_error);
    assert!(out.text.starts_with("Error getting project info"));
    assert!(out.text.contains("401"));
    assert_eq!(dispatcher.memory().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn tools_without_policy_do_not_write_memory() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = test_dispatcher(dir.path());

    for (tool, args) in [
        ("get_repo_details", json!({"repo": "octocat/hello-world"})),
        ("get_repository_issues", json!({"repo": "octocat/hello-world"})),
        ("search_github_code", json!({"query": "tokio", "language": "rust"})),
        ("get_issues", json!({})),
    ] {
        let out = dispatcher
            .invoke(tool, params(args), Originator::Endpoint)
            .await
            .unwrap();
        assert!(!out.is_error, "{tool}: {}", out.text);
    }
    assert_eq!(dispatcher.memory().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_invocations_share_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = std::sync::Arc::new(test_dispatcher(dir.path()));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let dispatcher = dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            dispatcher
                .invoke(
                    "add_memory",
                    params(json!({"content": format!("note {i}")})),
                    Originator::Endpoint,
                )
                .await
                .unwrap();
            dispatcher
                .invoke("get_memory", params(json!({"query": "note"})), Originator::Endpoint)
                .await
                .unwrap()
        }));
    }
    for task in tasks {
        assert!(!task.await.unwrap().is_error);
    }
    assert_eq!(dispatcher.memory().count(None).await.unwrap(), 8);
}

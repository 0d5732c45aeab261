//! Documentation Q&A over a local markdown file.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::params::{ParamKind, ParamSpec, ToolArgs};
use super::registry::{RetryPolicy, ToolDescriptor, ToolHandler};
use crate::clients::model::LanguageModel;
use crate::error::ToolFailure;

const MAX_EXCERPTS: usize = 3;

pub fn descriptors(path: PathBuf, model: Arc<dyn LanguageModel>) -> Vec<ToolDescriptor> {
    vec![ToolDescriptor::new(
        "search_docs",
        "Answer a question from the project's API reference documentation.",
        SearchDocs { path, model },
    )
    .param(ParamSpec::new("query", ParamKind::String, "Question or search term"))
    .retry(RetryPolicy::Idempotent)]
}

struct SearchDocs {
    path: PathBuf,
    model: Arc<dyn LanguageModel>,
}

#[async_trait]
impl ToolHandler for SearchDocs {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        let query = args.str("query");
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ToolFailure::new("reading documentation", e))?;

        let excerpts = select_excerpts(&text, query, MAX_EXCERPTS);
        if excerpts.is_empty() {
            return Ok(format!("'{query}' not found in the documentation."));
        }

        let prompt = format!(
            "Answer the question using only the documentation excerpts below.\n\n\
             Question: {query}\n\nExcerpts:\n{}",
            excerpts.join("\n\n---\n\n")
        );
        self.model
            .generate(&prompt)
            .await
            .map_err(|e| ToolFailure::new("querying model", e))
    }
}

/// Paragraphs mentioning the whole query first, then any query term, in
/// document order within each group. Case-insensitive.
pub fn select_excerpts<'a>(text: &'a str, query: &str, limit: usize) -> Vec<&'a str> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    let terms: Vec<&str> = query
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .collect();

    let paragraphs: Vec<(&str, String)> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| (p, p.to_lowercase()))
        .collect();

    let whole = paragraphs.iter().filter(|(_, lower)| lower.contains(&query));
    let partial = paragraphs
        .iter()
        .filter(|(_, lower)| !lower.contains(&query) && terms.iter().any(|t| lower.contains(t)));

    whole.chain(partial).take(limit).map(|(p, _)| *p).collect()
}

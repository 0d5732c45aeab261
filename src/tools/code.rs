//! Structural analysis of a source buffer.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::params::{ParamKind, ParamSpec, ToolArgs};
use super::registry::{RetryPolicy, ToolDescriptor, ToolHandler};
use crate::clients::parser::{CodeParser, CodeStructure};
use crate::error::{ParserError, ToolFailure};

const ANALYZE_TIMEOUT: Duration = Duration::from_secs(10);

pub fn descriptors(parser: Arc<dyn CodeParser>) -> Vec<ToolDescriptor> {
    vec![ToolDescriptor::new(
        "analyze_file_content",
        "List the functions, classes and imports of a Python, JavaScript or TypeScript buffer.",
        AnalyzeFileContent { parser },
    )
    .param(ParamSpec::new("content", ParamKind::String, "Source text"))
    .param(ParamSpec::new(
        "language",
        ParamKind::Optional(&ParamKind::String),
        "python (default), javascript or typescript",
    ))
    .retry(RetryPolicy::Idempotent)
    .timeout(ANALYZE_TIMEOUT)]
}

struct AnalyzeFileContent {
    parser: Arc<dyn CodeParser>,
}

#[async_trait]
impl ToolHandler for AnalyzeFileContent {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        let content = args.str("content").to_string();
        let language = args.get_str("language").unwrap_or("python").to_string();
        let parser = Arc::clone(&self.parser);

        let report = tokio::task::spawn_blocking(move || parser.analyze(&content, &language))
            .await
            .map_err(|e| ToolFailure::new("analyzing code", ParserError::Unavailable(e.to_string())))?
            .map_err(|e| ToolFailure::new("analyzing code", e))?;
        Ok(render_structure(&report))
    }
}

pub fn render_structure(report: &CodeStructure) -> String {
    fn list(items: &[String]) -> String {
        if items.is_empty() {
            "(none)".into()
        } else {
            items.join(", ")
        }
    }

    let mut out = format!(
        "Language: {}\nFunctions: {}\nClasses: {}\nImports:",
        report.language.as_str(),
        list(&report.functions),
        list(&report.classes)
    );
    if report.imports.is_empty() {
        out.push_str(" (none)");
    }
    for import in &report.imports {
        out.push_str(&format!("\n- {import}"));
    }
    out
}

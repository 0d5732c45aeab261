//! Agent Endpoint: the tool registry served over MCP Streamable HTTP (SSE).
//!
//! Tools are registered at runtime, so [`AgentEndpoint`] implements
//! `list_tools` and `call_tool` directly on top of the [`Dispatcher`] rather
//! than through the `#[tool_router]` macros.

use anyhow::Result;
use rmcp::model::{
    CallToolResult, Content, Implementation, ListToolsResult, ServerCapabilities, ServerInfo,
    Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use std::sync::Arc;

#[allow(deprecated)]
use rmcp::model::{CallToolRequestParam, PaginatedRequestParam};

use crate::bootstrap::Services;
use crate::error::DispatchError;
use crate::tools::dispatch::{Dispatcher, Originator, ToolOutput};

const DEFAULT_INSTRUCTIONS: &str = "Developer assistant. Use add_memory/get_memory to keep notes, \
     get_repo_info/get_diffs/get_commit_history for the local repository, the get_* GitHub tools \
     and summarize_issue for remote repositories, search_docs for the API reference and \
     analyze_file_content for source structure.";

#[derive(Clone)]
pub struct AgentEndpoint {
    dispatcher: Arc<Dispatcher>,
    name: String,
    instructions: String,
}

impl AgentEndpoint {
    pub fn new(dispatcher: Arc<Dispatcher>, name: &str, instructions: Option<String>) -> Self {
        Self {
            dispatcher,
            name: name.to_string(),
            instructions: instructions.unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
        }
    }

    /// Capability advertisement: every registered descriptor with its schema.
    pub fn tools(&self) -> Vec<Tool> {
        self.dispatcher
            .registry()
            .list()
            .iter()
            .map(|d| Tool::new(d.name, d.description, d.input_schema()))
            .collect()
    }
}

fn to_call_result(outcome: Result<ToolOutput, DispatchError>) -> Result<CallToolResult, ErrorData> {
    match outcome {
        Ok(ToolOutput {
            text,
            is_error: false,
        }) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Ok(ToolOutput {
            text,
            is_error: true,
        }) => Ok(CallToolResult::error(vec![Content::text(text)])),
        Err(e @ (DispatchError::UnknownTool(_) | DispatchError::BadArgument { .. })) => {
            Err(ErrorData::invalid_params(e.to_string(), None))
        }
        Err(e) => Err(ErrorData::internal_error(e.to_string(), None)),
    }
}

impl ServerHandler for AgentEndpoint {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(self.instructions.clone()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[allow(deprecated)]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    #[allow(deprecated)]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let params = request.arguments.unwrap_or_default();
        // Losing the race drops the dispatch future, which aborts the handler task.
        tokio::select! {
            outcome = self.dispatcher.invoke(&request.name, params, Originator::Endpoint) => {
                to_call_result(outcome)
            }
            _ = context.ct.cancelled() => {
                tracing::info!(tool = %request.name, "invocation cancelled by client");
                Err(ErrorData::internal_error("request cancelled", None))
            }
        }
    }
}

/// Start the endpoint over Streamable HTTP (SSE) and serve until ctrl-c.
pub async fn serve_sse(services: Services) -> Result<()> {
    let config = Arc::clone(&services.config);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let path = config.server.path.clone();

    tracing::info!(addr = %bind_addr, name = %config.server.name, "starting agent endpoint on SSE/HTTP");

    let endpoint = AgentEndpoint::new(
        services.dispatcher,
        &config.server.name,
        config.forwarded_instructions(),
    );
    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(endpoint.clone()),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service(&path, service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "agent endpoint listening at http://{bind_addr}{path}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down agent endpoint");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_argument_maps_to_invalid_params() {
        let err = to_call_result(Err(DispatchError::bad_argument("repo", "string"))).unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("repo"));

        let err = to_call_result(Err(DispatchError::UnknownTool("nope".into()))).unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn collaborator_failure_is_an_error_result() {
        let result = to_call_result(Ok(ToolOutput {
            text: "Error getting issues: boom".into(),
            is_error: true,
        }))
        .unwrap();
        assert_eq!(result.is_error, Some(true));
    }
}

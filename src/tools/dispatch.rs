//! Routes invocations to registered handlers and applies the auto-memory
//! policy after successful calls.
//!
//! Every handler runs in its own tokio task, aborted as soon as the caller
//! stops waiting (a dropped endpoint connection, a timeout). Blocking work a
//! handler has already handed to `spawn_blocking` finishes and is discarded.
//! Handler failures ([`ToolFailure`]) are delivered to the caller as
//! error-flagged text and never reach the Memory Store.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::params::{validate, ToolArgs};
use super::registry::{AutoMemory, Registry, RetryPolicy, ToolDescriptor};
use crate::context::ContextEnricher;
use crate::error::{DispatchError, ToolFailure};
use crate::memory::types::ContextType;
use crate::memory::MemoryStore;

/// Aborts a handler task when the future awaiting it is dropped.
struct AbortOnDrop(tokio::task::AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Originator {
    Endpoint,
    FrontEnd,
}

impl std::fmt::Display for Originator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Endpoint => "endpoint",
            Self::FrontEnd => "front_end",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub id: u64,
    pub tool: String,
    pub params: Map<String, Value>,
    pub originator: Originator,
    /// The command line that produced this invocation, when there is one.
    pub command: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Invocation {
    /// Verbatim command for front-end calls, `tool {params}` otherwise.
    pub fn rendered(&self) -> String {
        match &self.command {
            Some(command) => command.clone(),
            None if self.params.is_empty() => self.tool.clone(),
            None => format!("{} {}", self.tool, Value::Object(self.params.clone())),
        }
    }
}

/// What the caller receives for a dispatched invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    /// Set when the handler reported a collaborator failure.
    pub is_error: bool,
}

pub struct Dispatcher {
    registry: Registry,
    memory: MemoryStore,
    enricher: ContextEnricher,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new(registry: Registry, memory: MemoryStore, enricher: ContextEnricher) -> Self {
        Self {
            registry,
            memory,
            enricher,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn enricher(&self) -> &ContextEnricher {
        &self.enricher
    }

    pub async fn invoke(
        &self,
        tool: &str,
        params: Map<String, Value>,
        originator: Originator,
    ) -> Result<ToolOutput, DispatchError> {
        self.dispatch(self.invocation(tool, params, originator, None))
            .await
    }

    /// Front-end invocation; `command` is recorded verbatim in auto-memory metadata.
    pub async fn invoke_command(
        &self,
        tool: &str,
        params: Map<String, Value>,
        command: &str,
    ) -> Result<ToolOutput, DispatchError> {
        self.dispatch(self.invocation(
            tool,
            params,
            Originator::FrontEnd,
            Some(command.to_string()),
        ))
        .await
    }

    fn invocation(
        &self,
        tool: &str,
        params: Map<String, Value>,
        originator: Originator,
        command: Option<String>,
    ) -> Invocation {
        Invocation {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            tool: tool.to_string(),
            params,
            originator,
            command,
            timestamp: Utc::now(),
        }
    }

    async fn dispatch(&self, invocation: Invocation) -> Result<ToolOutput, DispatchError> {
        let descriptor = self
            .registry
            .get(&invocation.tool)
            .ok_or_else(|| DispatchError::UnknownTool(invocation.tool.clone()))?;
        let args = validate(&descriptor.params, &invocation.params)?;

        tracing::info!(
            id = invocation.id,
            tool = %invocation.tool,
            originator = %invocation.originator,
            "tool invoked"
        );

        match self.run(&descriptor, args.clone()).await? {
            Ok(text) => {
                if descriptor.auto_memory != AutoMemory::None {
                    self.remember(&descriptor, &invocation, &args, &text).await;
                }
                Ok(ToolOutput {
                    text,
                    is_error: false,
                })
            }
            Err(ToolFailure(text)) => {
                tracing::warn!(id = invocation.id, tool = %invocation.tool, error = %text, "tool failed");
                Ok(ToolOutput {
                    text,
                    is_error: true,
                })
            }
        }
    }

    async fn run(
        &self,
        descriptor: &ToolDescriptor,
        args: ToolArgs,
    ) -> Result<Result<String, ToolFailure>, DispatchError> {
        let attempts = match descriptor.retry {
            RetryPolicy::None => 1,
            RetryPolicy::Idempotent => 2,
        };

        for attempt in 1..=attempts {
            let handler = Arc::clone(&descriptor.handler);
            let call_args = args.clone();
            let task = tokio::spawn(async move { handler.call(call_args).await });
            let _guard = AbortOnDrop(task.abort_handle());

            let joined = match descriptor.timeout {
                None => task.await,
                Some(limit) => match tokio::time::timeout(limit, task).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        tracing::warn!(tool = descriptor.name, attempt, "tool timed out");
                        continue;
                    }
                },
            };

            return joined.map_err(|e| DispatchError::Handler {
                tool: descriptor.name.to_string(),
                message: e.to_string(),
            });
        }

        Err(DispatchError::Timeout {
            tool: descriptor.name.to_string(),
            secs: descriptor.timeout.map(|t| t.as_secs()).unwrap_or_default(),
        })
    }

    async fn remember(
        &self,
        descriptor: &ToolDescriptor,
        invocation: &Invocation,
        args: &ToolArgs,
        result: &str,
    ) {
        let context_type = ContextType::for_tool(descriptor.name);
        let mut metadata = self.enricher.snapshot().await.metadata();
        if descriptor.auto_memory == AutoMemory::Summary {
            for (key, value) in args.as_map() {
                metadata.insert(key.clone(), value.clone());
            }
        }
        metadata.insert("command".into(), invocation.rendered().into());

        match self.memory.add(result, context_type, metadata).await {
            Ok(_) => tracing::debug!(id = invocation.id, %context_type, "auto-memory written"),
            Err(e) => tracing::warn!(id = invocation.id, error = %e, "auto-memory write failed"),
        }
    }
}

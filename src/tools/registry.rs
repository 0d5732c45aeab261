//! Tool descriptors and the registry that binds them to stable names.
//!
//! The registry is built once during bootstrap and is read-only afterwards.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::params::{input_schema, ParamSpec, ToolArgs};
use crate::error::{DispatchError, ToolFailure};

/// A tool implementation. Must be safe to call concurrently.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure>;
}

/// What the dispatcher writes to memory after a successful call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoMemory {
    None,
    /// The result, with the invocation's arguments copied into metadata.
    Summary,
    /// The rendered result as-is.
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    None,
    /// Safe to run twice: a timed-out attempt is retried once.
    Idempotent,
}

pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    pub handler: Arc<dyn ToolHandler>,
    pub auto_memory: AutoMemory,
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
}

impl ToolDescriptor {
    pub fn new(
        name: &'static str,
        description: &'static str,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
            handler: Arc::new(handler),
            auto_memory: AutoMemory::None,
            retry: RetryPolicy::None,
            timeout: None,
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn auto_memory(mut self, policy: AutoMemory) -> Self {
        self.auto_memory = policy;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn input_schema(&self) -> serde_json::Map<String, serde_json::Value> {
        input_schema(&self.params)
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("auto_memory", &self.auto_memory)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    tools: Vec<Arc<ToolDescriptor>>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), DispatchError> {
        if self.index.contains_key(descriptor.name) {
            return Err(DispatchError::AlreadyRegistered(descriptor.name.to_string()));
        }
        self.index.insert(descriptor.name, self.tools.len());
        self.tools.push(Arc::new(descriptor));
        Ok(())
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> &[Arc<ToolDescriptor>] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<Arc<ToolDescriptor>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::params::ParamKind;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
            Ok(args.str("text").to_string())
        }
    }

    fn echo(name: &'static str) -> ToolDescriptor {
        ToolDescriptor::new(name, "echo", Echo).param(ParamSpec::new(
            "text",
            ParamKind::String,
            "text to echo",
        ))
    }

    #[test]
    fn list_keeps_registration_order() {
        let mut registry = Registry::new();
        for name in ["b", "a", "c"] {
            registry.register(echo(name)).unwrap();
        }
        let names: Vec<_> = registry.list().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry = Registry::new();
        registry.register(echo("echo")).unwrap();
        let err = registry.register(echo("echo")).unwrap_err();
        assert_eq!(err, DispatchError::AlreadyRegistered("echo".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn builder_sets_policies() {
        let descriptor = echo("echo")
            .auto_memory(AutoMemory::Raw)
            .retry(RetryPolicy::Idempotent)
            .timeout(Duration::from_secs(5));
        assert_eq!(descriptor.auto_memory, AutoMemory::Raw);
        assert_eq!(descriptor.retry, RetryPolicy::Idempotent);
        assert_eq!(descriptor.timeout, Some(Duration::from_secs(5)));
        assert_eq!(descriptor.input_schema()["required"], serde_json::json!(["text"]));
    }
}

//! Error types shared across components.
//!
//! Startup errors are the only fatal class. Dispatch errors are structured and
//! reported to the originator. Collaborator errors are converted to strings at
//! the tool boundary (see [`ToolFailure`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Required environment variables not found: {}", .0.join(", "))]
    MissingEnvVars(Vec<String>),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("working directory not found: {0}")]
    WorkingDirectory(String),

    #[error("not a git working copy: {0}")]
    NotAWorkingCopy(String),
}

/// Errors raised by the tool dispatcher itself, never by collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("bad argument '{name}': expected {expected}")]
    BadArgument { name: String, expected: String },

    #[error("tool already registered: {0}")]
    AlreadyRegistered(String),

    #[error("{tool}: timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("{tool}: {message}")]
    Handler { tool: String, message: String },
}

impl DispatchError {
    pub fn bad_argument(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::BadArgument {
            name: name.into(),
            expected: expected.into(),
        }
    }
}

/// A collaborator failure rendered for the user. Delivered as the tool's
/// text result, but never written to memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ToolFailure(pub String);

impl ToolFailure {
    /// `Error <doing>: <cause>`
    pub fn new(doing: &str, cause: impl std::fmt::Display) -> Self {
        Self(format!("Error {doing}: {cause}"))
    }
}

#[derive(Debug, Clone, Error)]
pub enum CodeHostError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("API request failed: {message} (status: {status})")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid repository name '{0}': expected owner/name")]
    InvalidName(String),
}

#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("API request failed: {message} (status: {status})")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("model returned no text")]
    EmptyResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParserError {
    #[error("Language {0} not supported")]
    UnsupportedLanguage(String),

    #[error("Code analysis not available: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error)]
pub enum RepoError {
    #[error("No git repository found")]
    NotARepository,

    #[error("git error: {0}")]
    Git(String),

    #[error("git operation timed out after {0}s")]
    Timeout(u64),
}

impl From<git2::Error> for RepoError {
    fn from(e: git2::Error) -> Self {
        Self::Git(e.message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_lists_keys() {
        let err = StartupError::MissingEnvVars(vec!["TOKEN_X".into(), "TOKEN_Y".into()]);
        assert_eq!(
            err.to_string(),
            "Required environment variables not found: TOKEN_X, TOKEN_Y"
        );
    }

    #[test]
    fn tool_failure_prefix() {
        let failure = ToolFailure::new("getting issues", "boom");
        assert_eq!(failure.to_string(), "Error getting issues: boom");
    }
}

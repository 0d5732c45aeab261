use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::StartupError;

/// File name of the agent configuration, resolved against the working directory.
pub const CONFIG_FILE: &str = ".agent.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AgentConfig {
    pub security: SecurityConfig,
    pub server: ServerConfig,
    pub memory: MemoryConfig,
    pub embedding: EmbeddingConfig,
    pub github: GithubConfig,
    pub model: ModelConfig,
    pub docs: DocsConfig,
    pub git: GitConfig,
    /// Keys this crate does not interpret. Forwarded to the agent endpoint.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SecurityConfig {
    pub use_env_variables: bool,
    pub required_env_vars: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub db_path: String,
    pub max_results: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `hashed` or `local`.
    pub provider: String,
    /// Model name, recorded in the provider id.
    pub model: String,
    /// Directory holding `model.onnx` and `tokenizer.json` for `local`.
    pub model_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GithubConfig {
    pub api_url: String,
    pub token_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DocsConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GitConfig {
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "pair_programming_agent".into(),
            host: "127.0.0.1".into(),
            port: 8000,
            path: "/mcp".into(),
            log_level: "info".into(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: ":memory:".into(),
            max_results: 3,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashed".into(),
            model: "all-MiniLM-L6-v2".into(),
            model_dir: "~/.devagent/models/all-MiniLM-L6-v2".into(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".into(),
            token_env: "GITHUB_TOKEN".into(),
            timeout_secs: 30,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".into(),
            model: "codellama".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_secs: 30,
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            path: "docs/api_reference.md".into(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl AgentConfig {
    /// Load `.agent.json` from the current working directory.
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load from a specific path (defaults when absent), apply env var overrides,
    /// then enforce `security.required_env_vars`.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            serde_json::from_str(&contents).map_err(|e| {
                StartupError::Config(format!("{}: {e}", path.display()))
            })?
        } else {
            info!("no config file at {}, using defaults", path.display());
            AgentConfig::default()
        };

        config.apply_env_overrides();
        config.check_required_env()?;
        Ok(config)
    }

    /// Apply environment variable overrides (AGENT_LOG_LEVEL, AGENT_DB).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("AGENT_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("AGENT_DB") {
            self.memory.db_path = val;
        }
    }

    /// Fails with every missing key named when `security.use_env_variables` is set.
    pub fn check_required_env(&self) -> Result<(), StartupError> {
        if !self.security.use_env_variables {
            return Ok(());
        }
        let missing: Vec<String> = self
            .security
            .required_env_vars
            .iter()
            .filter(|key| std::env::var(key.as_str()).map_or(true, |v| v.is_empty()))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StartupError::MissingEnvVars(missing))
        }
    }

    /// Resolve the memory database path, expanding `~` if needed.
    /// `:memory:` is passed through untouched.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.memory.db_path)
    }

    /// Endpoint instructions forwarded from the untyped part of the config.
    pub fn forwarded_instructions(&self) -> Option<String> {
        self.extra
            .get("instructions")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Switch the process into `AGENT_WORKDIR` when it is set.
pub fn apply_workdir_override() -> Result<(), StartupError> {
    let Ok(dir) = std::env::var("AGENT_WORKDIR") else {
        return Ok(());
    };
    let path = PathBuf::from(&dir);
    if !path.is_dir() {
        return Err(StartupError::WorkingDirectory(dir));
    }
    std::env::set_current_dir(&path)
        .map_err(|e| StartupError::WorkingDirectory(format!("{dir}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AgentConfig::default();
        assert_eq!(config.server.name, "pair_programming_agent");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.memory.db_path, ":memory:");
        assert_eq!(config.memory.max_results, 3);
        assert_eq!(config.github.timeout_secs, 30);
        assert_eq!(config.git.timeout_secs, 10);
        assert!(!config.security.use_env_variables);
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{
            "security": { "use_env_variables": true, "required_env_vars": ["A", "B"] },
            "server": { "port": 9100 },
            "model": { "model": "llama3" },
            "embedding": { "provider": "local", "model_dir": "/opt/minilm" },
            "instructions": "be terse",
            "transport": "sse"
        }"#;
        let config: AgentConfig = serde_json::from_str(json).unwrap();
        assert!(config.security.use_env_variables);
        assert_eq!(config.security.required_env_vars, vec!["A", "B"]);
        assert_eq!(config.server.port, 9100);
        // defaults still apply for unset fields
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.model.model, "llama3");
        assert_eq!(config.model.timeout_secs, 30);
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.embedding.model, "all-MiniLM-L6-v2");
        assert_eq!(config.embedding.model_dir, "/opt/minilm");
        assert_eq!(config.forwarded_instructions().as_deref(), Some("be terse"));
        assert_eq!(config.extra.get("transport").and_then(|v| v.as_str()), Some("sse"));
    }

    #[test]
    fn required_env_ignored_when_disabled() {
        let mut config = AgentConfig::default();
        config.security.required_env_vars = vec!["DEVAGENT_TEST_NEVER_SET".into()];
        assert!(config.check_required_env().is_ok());
    }

    #[test]
    fn missing_required_env_names_every_key() {
        let mut config = AgentConfig::default();
        config.security.use_env_variables = true;
        config.security.required_env_vars = vec![
            "DEVAGENT_TEST_MISSING_ONE".into(),
            "DEVAGENT_TEST_MISSING_TWO".into(),
        ];
        let err = config.check_required_env().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("DEVAGENT_TEST_MISSING_ONE"));
        assert!(message.contains("DEVAGENT_TEST_MISSING_TWO"));
    }

    #[test]
    fn memory_path_passes_through() {
        let config = AgentConfig::default();
        assert_eq!(config.resolved_db_path(), PathBuf::from(":memory:"));
    }
}

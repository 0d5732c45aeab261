//! Developer-assistant agent: persistent semantic memory, documentation Q&A,
//! local git introspection, GitHub introspection, issue summarization and
//! source structure analysis, exposed as MCP tools.
//!
//! Every capability is a typed tool descriptor held by one registry. The same
//! [`tools::dispatch::Dispatcher`] serves two originators:
//!
//! - the **agent endpoint** ([`server`]), MCP over Streamable HTTP (SSE)
//! - the **interactive front end** ([`cli`]), a slash-command prompt
//!
//! After a successful `summarize_issue` or `get_project_info` call the
//! dispatcher writes the result to memory, tagged with the current branch and
//! commit.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   cosine search over deterministic hashed bag-of-words embeddings
//! - **Local repository**: libgit2 via `git2`
//! - **Code hosting**: GitHub REST API via `reqwest`
//! - **Model**: any OpenAI-compatible chat completions server (Ollama by default)
//! - **Parsing**: tree-sitter grammars for Python, JavaScript and TypeScript
//!
//! # Modules
//!
//! - [`config`] — `.agent.json`, env overrides and required-variable checks
//! - [`db`] — SQLite connection, sqlite-vec registration and schema
//! - [`embedding`] — the embedding provider trait and the hashed provider
//! - [`memory`] — the Memory Store
//! - [`context`] — repository snapshots for metadata enrichment
//! - [`clients`] — collaborator clients
//! - [`tools`] — registry, dispatcher and tool handlers
//! - [`bootstrap`] — one-time construction and injection of all of the above

pub mod bootstrap;
pub mod cli;
pub mod clients;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod server;
pub mod tools;

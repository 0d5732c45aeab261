//! Collaborator clients. Each module is the only place its transport or
//! library is touched; the rest of the crate sees the small typed facade.
//!
//! - [`local_repo`] — the working copy, via `git2`
//! - [`github`] — the code-hosting provider, via its REST API
//! - [`model`] — the language-model backend, via an OpenAI-compatible API
//! - [`parser`] — source structure, via tree-sitter

pub mod github;
pub mod local_repo;
pub mod model;
pub mod parser;

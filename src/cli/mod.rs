//! Interactive front end: reads slash commands from stdin, dispatches them
//! one at a time and prints each result in a panel.

pub mod command;
pub mod render;

use anyhow::Result;
use serde_json::Map;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::bootstrap::Services;
use crate::clients::parser::infer_language;
use crate::error::DispatchError;
use crate::memory::types::Metadata;
use crate::tools::dispatch::{Dispatcher, Originator, ToolOutput};
use command::Command;

/// What the loop does with one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Exit,
    /// Printed without a panel; no handler ran.
    Usage(String),
    Output(String),
    /// A handler ran and reported a failure.
    Failed(String),
}

impl Reply {
    /// Text the loop prints, `None` for [`Reply::Exit`]. Every handler
    /// result is panelled, failures included.
    pub fn display(&self) -> Option<String> {
        match self {
            Reply::Exit => None,
            Reply::Usage(hint) => Some(format!("{hint}\n")),
            Reply::Output(text) | Reply::Failed(text) => Some(render::panel(text)),
        }
    }
}

pub async fn run(services: Services) -> Result<()> {
    let dispatcher = services.dispatcher;
    let home = dirs::home_dir();

    print!(
        "{}",
        render::banner(
            &render::session_id(),
            &render::tilde_path(&services.workdir, home.as_deref()),
            &services.model_name,
        )
    );
    println!("Type /help for commands, exit to quit.\n");

    let venv = std::env::var("VIRTUAL_ENV").ok().and_then(|v| {
        Path::new(&v)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    });
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let snapshot = dispatcher.enricher().snapshot().await;
        let cwd = std::env::current_dir()
            .map(|p| render::tilde_path(&p, home.as_deref()))
            .unwrap_or_default();
        println!("{}", render::dim(&render::status_line(venv.as_deref(), &cwd, &snapshot)));
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match execute(&dispatcher, line).await.display() {
            Some(text) => println!("{text}"),
            None => break,
        }
    }

    tracing::info!("interactive session ended");
    Ok(())
}

/// Parse and run one command line. Strictly sequential: returns only after
/// the handler and any auto-memory write have finished.
pub async fn execute(dispatcher: &Dispatcher, line: &str) -> Reply {
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(usage) => return Reply::Usage(usage.to_string()),
    };

    let (tool, params) = match &command {
        Command::Exit => return Reply::Exit,
        Command::Help => return Reply::Output(render::help()),
        Command::CodeAnalyze { path, language } => {
            let content = match tokio::fs::read_to_string(path).await {
                Ok(content) => content,
                Err(e) => return Reply::Failed(format!("Error reading {}: {e}", path.display())),
            };
            let language = language.clone().unwrap_or_else(|| infer_language(path));
            let mut params = Map::new();
            params.insert("content".into(), content.into());
            params.insert("language".into(), language.into());
            ("analyze_file_content", params)
        }
        other => match other.tool_call() {
            Some(call) => call,
            None => return Reply::Usage(render::help()),
        },
    };

    let reply = reply_for(dispatcher.invoke_command(tool, params, line).await);

    if matches!(command, Command::GitInfo | Command::GitDiff) {
        if let Reply::Output(text) = &reply {
            remember_dirty_repo(dispatcher, &command, text, line).await;
        }
    }
    reply
}

fn reply_for(outcome: Result<ToolOutput, DispatchError>) -> Reply {
    match outcome {
        Ok(ToolOutput {
            text,
            is_error: false,
        }) => Reply::Output(text),
        Ok(ToolOutput {
            text,
            is_error: true,
        }) => Reply::Failed(text),
        Err(e @ DispatchError::BadArgument { .. }) => Reply::Usage(e.to_string()),
        Err(e) => Reply::Failed(format!("Error: {e}")),
    }
}

/// After `/git info` or `/git diff`, a working copy with modified or staged
/// paths is written to memory as the rendered info followed by the diffs.
async fn remember_dirty_repo(dispatcher: &Dispatcher, command: &Command, shown: &str, line: &str) {
    let snapshot = dispatcher.enricher().snapshot().await;
    let Some(git) = snapshot.to_git_context().filter(|_| snapshot.is_dirty()) else {
        return;
    };

    let other_tool = match command {
        Command::GitInfo => "get_diffs",
        _ => "get_repo_info",
    };
    let other = match dispatcher
        .invoke(other_tool, Map::new(), Originator::FrontEnd)
        .await
    {
        Ok(ToolOutput {
            text,
            is_error: false,
        }) => text,
        _ => return,
    };
    let content = match command {
        Command::GitInfo => format!("{shown}\n\n{other}"),
        _ => format!("{other}\n\n{shown}"),
    };

    let mut metadata = Metadata::new();
    metadata.insert("command".into(), line.into());
    if let Err(e) = dispatcher.memory().add_repo(&content, &git, metadata).await {
        tracing::warn!(error = %e, "repository auto-memory failed");
    }
}

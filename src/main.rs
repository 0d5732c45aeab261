use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use devagent::config::{self, AgentConfig};
use devagent::{bootstrap, cli, server};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "agent.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Serve the agent endpoint over SSE/HTTP
    Server,
    /// Run the interactive command-line front end
    Cli,
}

#[derive(Parser)]
#[command(name = "devagent", version, about = "Developer-assistant MCP agent")]
struct Args {
    #[arg(long, value_enum, default_value_t = Mode::Server)]
    mode: Mode,
}

/// File logging under `logs/`, plus stderr in server mode. The interactive
/// front end keeps the terminal to itself.
fn init_tracing(level: &str, mode: Mode) -> Result<()> {
    std::fs::create_dir_all(LOG_DIR).context("failed to create logs directory")?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(std::path::Path::new(LOG_DIR).join(LOG_FILE))
        .context("failed to open log file")?;

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file));
    let stderr_layer = (mode == Mode::Server)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize logging")?;
    Ok(())
}

async fn start(mode: Mode) -> Result<()> {
    config::apply_workdir_override()?;
    dotenvy::dotenv().ok();

    let config = AgentConfig::load()?;
    if mode == Mode::Cli {
        let cwd = std::env::current_dir().context("failed to read working directory")?;
        bootstrap::require_working_copy(&cwd)?;
    }
    init_tracing(&config.server.log_level, mode)?;
    tracing::info!(mode = ?mode, "starting devagent");

    let services = bootstrap::build(config)?;
    match mode {
        Mode::Server => server::serve_sse(services).await,
        Mode::Cli => cli::run(services).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match start(args.mode).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "fatal");
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

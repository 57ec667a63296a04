mod cli;

use crate::cli::app::{App, ViewMode};
use anyhow::Context;
use clap::Parser;
use pipeline_tracker::config::{ENV_ACCESS_TOKEN, ENV_API_KEY, ENV_STATE_PATH, ENV_URL};
use pipeline_tracker::session::TrackerSession;
use pipeline_tracker::store::{MemoryStore, RemoteStore, RestStore};
use pipeline_tracker::{AppState, TrackerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Terminal pipeline tracker with inline editing.
#[derive(Debug, Parser)]
#[command(name = "pipeline-tracker", version, about)]
struct Args {
    /// Project base URL (REST API under /rest/v1)
    #[arg(long, env = ENV_URL, required_unless_present = "demo")]
    url: Option<String>,

    /// Public API key
    #[arg(long, env = ENV_API_KEY, required_unless_present = "demo", hide_env_values = true)]
    api_key: Option<String>,

    /// User access token; the API key is sent when absent
    #[arg(long, env = ENV_ACCESS_TOKEN, hide_env_values = true)]
    access_token: Option<String>,

    /// Run against a seeded in-memory store
    #[arg(long)]
    demo: bool,

    /// Application state file (sidebar, filters, widths, sort)
    #[arg(long, env = ENV_STATE_PATH, default_value = "tracker-state.json")]
    state: PathBuf,

    #[arg(long, value_enum, default_value = "table")]
    view: ViewMode,

    /// Log destination; the terminal is in raw mode while running
    #[arg(long, default_value = "pipeline-tracker.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let app_state = AppState::load(&args.state)
        .with_context(|| format!("failed to load state from {}", args.state.display()))?;

    if args.demo {
        log::info!("Starting with the in-memory demo store");
        let session = TrackerSession::new(Arc::new(MemoryStore::demo()), app_state);
        return run(session, args.view, &args.state).await;
    }

    let (Some(url), Some(api_key)) = (args.url.as_deref(), args.api_key.as_deref()) else {
        anyhow::bail!("--url and --api-key are required unless --demo is given");
    };
    let mut config = TrackerConfig::new(url, api_key);
    if let Some(token) = args.access_token.as_deref() {
        config = config.access_token(token);
    }
    let store = RestStore::new(config).context("invalid remote store configuration")?;
    log::info!("Connecting to {}", store.config().base_url);

    let session = TrackerSession::new(Arc::new(store), app_state);
    run(session, args.view, &args.state).await
}

async fn run<S: RemoteStore>(
    session: TrackerSession<S>,
    view: ViewMode,
    state_path: &Path,
) -> anyhow::Result<()> {
    let mut app = App::new(session, view);
    let result = app.run().await;

    let session = app.into_session();
    session
        .app_state()
        .save(state_path)
        .with_context(|| format!("failed to save state to {}", state_path.display()))?;
    result
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install logger: {}", err))
}

//! taper-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, wires up the Python measurement engine, and serves the JSON
//! API over HTTP.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use serde::Deserialize;
use taper_api::AppState;
use taper_pipeline::{PythonEngine, Staging};
use taper_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Taper measurement server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `TAPER_*` environment variables. Every field has a workable default so a
/// bare checkout starts.
#[derive(Deserialize, Clone)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host:                String,
  #[serde(default = "default_port")]
  port:                u16,
  #[serde(default = "default_store_path")]
  store_path:          PathBuf,
  #[serde(default = "default_staging_dir")]
  staging_dir:         PathBuf,
  #[serde(default = "default_engine_script")]
  engine_script:       PathBuf,
  /// Explicit interpreter path; when unset, common venv locations are
  /// probed before falling back to `python3` on PATH.
  python_path:         Option<PathBuf>,
  #[serde(default = "default_engine_timeout")]
  engine_timeout_secs: u64,
}

fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 3000 }
fn default_store_path() -> PathBuf { PathBuf::from("taper.db") }
fn default_staging_dir() -> PathBuf { PathBuf::from("staging") }
fn default_engine_script() -> PathBuf { PathBuf::from("scripts/body_measurement.py") }
fn default_engine_timeout() -> u64 { 30 }

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TAPER"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Staging area for uploaded image pairs.
  let staging = Staging::new(&server_cfg.staging_dir);
  staging.ensure_dir().await.with_context(|| {
    format!("failed to create staging dir {:?}", server_cfg.staging_dir)
  })?;

  // Open SQLite store.
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  // Wire up the external measurement engine.
  let python = server_cfg
    .python_path
    .clone()
    .unwrap_or_else(resolve_python);
  let engine = PythonEngine::new(&python, &server_cfg.engine_script)
    .with_timeout(Duration::from_secs(server_cfg.engine_timeout_secs));

  if engine.probe().await {
    tracing::info!(python = %python.display(), "measurement engine interpreter found");
  } else {
    tracing::warn!(
      python = %python.display(),
      "measurement engine interpreter not reachable; submissions will fail"
    );
  }

  // Build application state.
  let state = AppState {
    store: Arc::new(store),
    engine: Arc::new(engine),
    staging,
  };

  let app = taper_api::api_router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Probe the interpreter locations used by the deployment images before
/// falling back to whatever `python3` is on PATH.
fn resolve_python() -> PathBuf {
  let candidates = [
    PathBuf::from("/opt/venv/bin/python3"),
    PathBuf::from("venv/bin/python3"),
  ];
  for candidate in candidates {
    if candidate.exists() {
      return candidate;
    }
  }
  PathBuf::from("python3")
}

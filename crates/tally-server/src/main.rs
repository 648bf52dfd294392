//! tally-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite scan store, rebuilds the aggregate snapshot, and serves the
//! dashboard API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use tally_core::transition::ReentryPolicy;
use tally_engine::Engine;
use tally_server::{ServerConfig, backend::BackendResolver};
use tally_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "tally scan-state server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

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
    .add_source(config::Environment::with_prefix("TALLY"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  let policy = if server_cfg.allow_reentry {
    ReentryPolicy::Allow
  } else {
    ReentryPolicy::Reject
  };

  // Open SQLite scan store.
  let store = SqliteStore::open(&store_path, policy)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let resolver = BackendResolver::new(server_cfg.backend_url.clone())
    .context("failed to build backend client")?;

  // Build the engine and rebuild the aggregate snapshot from the store.
  let engine = Arc::new(Engine::new(
    Arc::new(store),
    Arc::new(resolver),
    Duration::from_secs(server_cfg.freshness_secs),
  ));

  let loaded = engine
    .bootstrap()
    .await
    .context("failed to rebuild aggregate snapshot")?;
  tracing::info!(records = loaded, "aggregate snapshot rebuilt");

  let app = tally_server::router(engine);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

//! strato server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens an
//! in-process SQLite store, connects the DSS gateway and subscriber
//! notifier, and serves the constraint API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use strato_dss::{DssGateway, HttpNotifier};
use strato_service::{AppState, Orchestrator, ServiceConfig};
use strato_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "strato constraint information server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("STRATO").separator("__"))
    .build()
    .context("failed to read config file")?;

  let service_cfg: ServiceConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServiceConfig")?;

  let store_path = expand_tilde(&service_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let gateway = DssGateway::new(service_cfg.dss.clone())
    .context("failed to build DSS gateway")?;
  let notifier = HttpNotifier::new(service_cfg.notifier.clone())
    .context("failed to build subscriber notifier")?;

  let state = AppState {
    orchestrator: Arc::new(Orchestrator {
      store,
      remote: gateway,
      notifier,
      policy: service_cfg.horizon.clone(),
    }),
    config:       Arc::new(service_cfg.clone()),
  };

  let app = strato_service::router(state);
  let address = format!("{}:{}", service_cfg.host, service_cfg.port);

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

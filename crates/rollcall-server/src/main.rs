//! rollcall server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, starts the device poller and serves the API and dashboard over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash`:
//!
//! ```
//! cargo run -p rollcall-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use rollcall_api::{ApiState, api_router};
use rollcall_biotime::BioTimeClient;
use rollcall_core::store::DirectoryStore;
use rollcall_engine::{Pipeline, Poller, TracingListener};
use rollcall_server::{ServerConfig, load};
use rollcall_sms::SmsSender;
use rollcall_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Rollcall attendance server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
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

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  // A configuration saved through the API wins over the file.
  let device = match store
    .device_config()
    .await
    .context("failed to read device configuration")?
  {
    Some(saved) => Some(saved),
    None => cfg.device.as_ref().map(|d| d.to_config()),
  };
  if device.is_none() {
    warn!("no device configured; polling will fail until one is saved");
  }
  let source = Arc::new(
    BioTimeClient::new(device, cfg.device_timeout()).context("failed to build device client")?,
  );

  if cfg.sms.is_none() {
    info!("sms gateway not configured; guardian messages will only be logged");
  }
  let sender = Arc::new(SmsSender::new(cfg.sms.clone()).context("failed to build sms client")?);

  let pipeline = Arc::new(Pipeline::new(store.clone(), source, sender, &cfg.reconcile));

  let poller = Arc::new(Poller::spawn(pipeline.clone(), TracingListener, cfg.poll.interval()));
  poller.start();
  let monitor = load::spawn_monitor(poller.clone(), cfg.poll.clone());

  let api = api_router(ApiState { store, pipeline });
  let app = rollcall_server::router(api, cfg.auth(), &cfg.static_dir);
  if cfg.auth().is_none() {
    warn!("admin authentication disabled; set auth_username and auth_password_hash");
  }

  let address = cfg.address();
  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  info!("shutting down");
  monitor.abort();
  let _ = monitor.await;
  match Arc::try_unwrap(poller) {
    Ok(poller) => poller.shutdown().await,
    Err(poller) => poller.stop(),
  }

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!("failed to listen for ctrl-c: {e}");
    std::future::pending::<()>().await;
  }
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
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

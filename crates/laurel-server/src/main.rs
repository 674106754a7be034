//! laurel server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! content and reference stores, and serves the achievement API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for an account's `password_hash`:
//!
//! ```
//! cargo run -p laurel-server --bin server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use laurel_engine::LifecycleEngine;
use laurel_server::{AppState, ServerConfig};
use laurel_store_sqlite::{SqliteContentStore, SqliteReferenceStore};
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Laurel achievement server")]
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

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("LAUREL"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if server_cfg.accounts.is_empty() {
    tracing::warn!("no accounts configured; every request will be rejected");
  }

  let content_path = expand_tilde(&server_cfg.content_store_path);
  let contents = SqliteContentStore::open(&content_path)
    .await
    .with_context(|| format!("failed to open content store at {content_path:?}"))?;

  let reference_path = expand_tilde(&server_cfg.reference_store_path);
  let references = SqliteReferenceStore::open(&reference_path)
    .await
    .with_context(|| format!("failed to open reference store at {reference_path:?}"))?;

  let engine = Arc::new(LifecycleEngine::new(
    contents,
    references,
    server_cfg.engine_config(),
  ));

  let state = AppState {
    engine: engine.clone(),
    auth:   Arc::new(server_cfg.auth_config()),
    config: Arc::new(server_cfg.clone()),
  };

  let app = laurel_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  match Arc::try_unwrap(engine) {
    Ok(engine) => {
      let (contents, references) = engine.into_stores();
      contents.close().await.context("failed to close content store")?;
      references.close().await.context("failed to close reference store")?;
      tracing::info!("stores closed");
    }
    Err(_) => tracing::warn!("store handles still in use at shutdown; not closing"),
  }

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
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

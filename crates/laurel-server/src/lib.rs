//! JSON HTTP layer for Laurel.
//!
//! Exposes an axum [`Router`] over a [`LifecycleEngine`] backed by any
//! [`ContentStore`] and [`ReferenceStore`]. Callers authenticate with HTTP
//! Basic credentials checked against the configured accounts.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post},
};
use laurel_core::store::{ContentStore, ReferenceStore};
use laurel_engine::{DEFAULT_CALL_TIMEOUT, EngineConfig, LifecycleEngine};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{Account, AuthConfig};
use handlers::{achievements, review};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub content_store_path:   PathBuf,
  pub reference_store_path: PathBuf,
  /// Upper bound on each individual store call.
  #[serde(default = "default_store_timeout_secs")]
  pub store_timeout_secs:   u64,
  #[serde(default)]
  pub accounts:             Vec<Account>,
}

fn default_store_timeout_secs() -> u64 { DEFAULT_CALL_TIMEOUT.as_secs() }

impl ServerConfig {
  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig { call_timeout: Duration::from_secs(self.store_timeout_secs) }
  }

  pub fn auth_config(&self) -> AuthConfig { AuthConfig { accounts: self.accounts.clone() } }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<C, R> {
  pub engine: Arc<LifecycleEngine<C, R>>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

// Derived `Clone` would demand `C: Clone, R: Clone`.
impl<C, R> Clone for AppState<C, R> {
  fn clone(&self) -> Self {
    Self {
      engine: self.engine.clone(),
      config: self.config.clone(),
      auth:   self.auth.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the achievement API.
pub fn router<C, R>(state: AppState<C, R>) -> Router
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  Router::new()
    .route(
      "/achievements",
      get(review::list_all::<C, R>).post(achievements::create::<C, R>),
    )
    .route("/achievements/me", get(achievements::list_mine::<C, R>))
    .route("/achievements/pending", get(review::list_pending::<C, R>))
    .route(
      "/achievements/{id}",
      get(achievements::get_one::<C, R>)
        .put(achievements::update::<C, R>)
        .delete(achievements::delete::<C, R>),
    )
    .route("/achievements/{id}/submit", post(achievements::submit::<C, R>))
    .route("/achievements/{id}/verify", post(review::verify::<C, R>))
    .route("/achievements/{id}/reject", post(review::reject::<C, R>))
    .route(
      "/achievements/{id}/attachments",
      post(achievements::add_attachment::<C, R>),
    )
    .route("/achievements/{id}/history", get(achievements::history::<C, R>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

//! Handlers for reviewers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/achievements` | `?status`, `?student_id`, `?limit`, `?offset` |
//! | `GET`  | `/achievements/pending` | Submitted only; `?limit`, `?offset` |
//! | `POST` | `/achievements/{id}/verify` | |
//! | `POST` | `/achievements/{id}/reject` | Body: `{"note":"..."}` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use laurel_core::{
  lifecycle::{AchievementReference, AchievementStatus, AchievementView},
  store::{ContentStore, ReferenceFilter, ReferenceStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::Error};

// ─── Listing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub status:     Option<AchievementStatus>,
  pub student_id: Option<Uuid>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

impl From<ListParams> for ReferenceFilter {
  fn from(p: ListParams) -> Self {
    ReferenceFilter {
      owner_id: p.student_id,
      status:   p.status,
      limit:    p.limit,
      offset:   p.offset,
    }
  }
}

/// `GET /achievements[?status=...][&student_id=...][&limit=...][&offset=...]`
pub async fn list_all<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AchievementView>>, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  let filter = ReferenceFilter::from(params);
  Ok(Json(state.engine.list_all(&caller, &filter).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /achievements/pending[?limit=...][&offset=...]`
pub async fn list_pending<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Query(page): Query<PageParams>,
) -> Result<Json<Vec<AchievementView>>, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  Ok(Json(state.engine.list_pending(&caller, page.limit, page.offset).await?))
}

// ─── Decisions ────────────────────────────────────────────────────────────────

/// `POST /achievements/{id}/verify`
pub async fn verify<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<AchievementReference>, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  Ok(Json(state.engine.verify(&caller, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  /// Required; a missing or blank note is a validation error.
  #[serde(default)]
  pub note: String,
}

/// `POST /achievements/{id}/reject`, body: `{"note":"..."}`.
pub async fn reject<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  Json(body): Json<RejectBody>,
) -> Result<Json<AchievementReference>, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  Ok(Json(state.engine.reject(&caller, id, &body.note).await?))
}

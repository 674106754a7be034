//! Handlers for the student-facing `/achievements` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`   | `/achievements` | Body: [`NewAchievementBody`]; returns 201 + reference |
//! | `GET`    | `/achievements/me` | Optional `?status` |
//! | `GET`    | `/achievements/{id}` | Composed view |
//! | `PUT`    | `/achievements/{id}` | Body: partial content fields |
//! | `DELETE` | `/achievements/{id}` | Drafts only; returns 204 |
//! | `POST`   | `/achievements/{id}/submit` | |
//! | `POST`   | `/achievements/{id}/attachments` | Body: attachment metadata |
//! | `GET`    | `/achievements/{id}/history` | Oldest first |

use std::collections::BTreeSet;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use laurel_core::{
  content::{CategoryDetails, ContentPatch, NewAttachment},
  lifecycle::{AchievementReference, AchievementStatus, AchievementView, HistoryEntry},
  store::{ContentStore, ReferenceStore},
};
use laurel_engine::NewAchievement;
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::Error};

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /achievements`.
#[derive(Debug, Deserialize)]
pub struct NewAchievementBody {
  pub title:       String,
  pub description: String,
  /// `{"category": "...", "data": {...}}`
  pub details:     CategoryDetails,
  #[serde(default)]
  pub tags:        BTreeSet<String>,
  #[serde(default)]
  pub points:      u32,
}

impl From<NewAchievementBody> for NewAchievement {
  fn from(b: NewAchievementBody) -> Self {
    NewAchievement {
      title:       b.title,
      description: b.description,
      details:     b.details,
      tags:        b.tags,
      points:      b.points,
    }
  }
}

/// `POST /achievements`: returns 201 + the new reference.
pub async fn create<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<NewAchievementBody>,
) -> Result<impl IntoResponse, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  let reference = state.engine.create(&caller, body.into()).await?;
  Ok((StatusCode::CREATED, Json(reference)))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MineParams {
  pub status: Option<AchievementStatus>,
}

/// `GET /achievements/me[?status=...]`
pub async fn list_mine<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Query(params): Query<MineParams>,
) -> Result<Json<Vec<AchievementView>>, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  Ok(Json(state.engine.list_mine(&caller, params.status).await?))
}

/// `GET /achievements/{id}`
pub async fn get_one<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<AchievementView>, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  Ok(Json(state.engine.get_by_id(&caller, id).await?))
}

/// `GET /achievements/{id}/history`
pub async fn history<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntry>>, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  Ok(Json(state.engine.list_history(&caller, id).await?))
}

// ─── Owner changes ────────────────────────────────────────────────────────────

/// `PUT /achievements/{id}`: only the provided fields are overwritten.
pub async fn update<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  Json(patch): Json<ContentPatch>,
) -> Result<Json<AchievementView>, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  Ok(Json(state.engine.update(&caller, id, patch).await?))
}

/// `POST /achievements/{id}/attachments`
pub async fn add_attachment<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  Json(attachment): Json<NewAttachment>,
) -> Result<Json<AchievementView>, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  Ok(Json(state.engine.add_attachment(&caller, id, attachment).await?))
}

/// `POST /achievements/{id}/submit`
pub async fn submit<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<AchievementReference>, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  Ok(Json(state.engine.submit(&caller, id).await?))
}

/// `DELETE /achievements/{id}`: returns 204.
pub async fn delete<C, R>(
  State(state): State<AppState<C, R>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, Error>
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  state.engine.delete(&caller, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

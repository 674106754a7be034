//! Create, update, submit, verify, reject and delete.
//!
//! Write ordering is fixed: content before reference on create, the
//! conditional reference write before the history append everywhere else.
//! History appends are best-effort; the reference status is authoritative.

use std::{collections::BTreeSet, future::Future, time::Duration};

use chrono::Utc;
use laurel_core::{
  caller::Caller,
  content::{
    AchievementContent, CategoryDetails, ContentId, ContentPatch, NewAttachment, NewContent,
  },
  lifecycle::{
    AchievementReference, AchievementStatus, AchievementView, Action, NewHistoryEntry,
    NewReference, StatusChange, is_legal_step,
  },
  store::{ContentStore, ReferenceStore, StoreError},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{Error, Result};

/// Upper bound on a single store call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// A store call that takes longer than this fails with
  /// [`Error::Transient`].
  pub call_timeout: Duration,
}

impl Default for EngineConfig {
  fn default() -> Self { Self { call_timeout: DEFAULT_CALL_TIMEOUT } }
}

/// Input to [`LifecycleEngine::create`]. The owner is always the caller.
#[derive(Debug, Clone)]
pub struct NewAchievement {
  pub title:       String,
  pub description: String,
  pub details:     CategoryDetails,
  pub tags:        BTreeSet<String>,
  pub points:      u32,
}

/// Orchestrates the achievement lifecycle over a content store `C` and a
/// reference store `R`.
pub struct LifecycleEngine<C, R> {
  pub(crate) contents:   C,
  pub(crate) references: R,
  config:                EngineConfig,
}

impl<C, R> LifecycleEngine<C, R>
where
  C: ContentStore,
  R: ReferenceStore,
{
  pub fn new(contents: C, references: R, config: EngineConfig) -> Self {
    Self { contents, references, config }
  }

  /// Give the store handles back, e.g. to close them at shutdown.
  pub fn into_stores(self) -> (C, R) { (self.contents, self.references) }

  // ── Store call plumbing ───────────────────────────────────────────────────

  /// Run one store call under the configured timeout and translate its error.
  pub(crate) async fn call<T, E, F>(&self, fut: F) -> Result<T>
  where
    E: StoreError,
    F: Future<Output = Result<T, E>>,
  {
    match tokio::time::timeout(self.config.call_timeout, fut).await {
      Ok(result) => result.map_err(Error::from_store),
      Err(_) => Err(Error::Transient(format!(
        "store call exceeded {:?}",
        self.config.call_timeout
      ))),
    }
  }

  pub(crate) async fn load_reference(&self, id: Uuid) -> Result<AchievementReference> {
    self
      .call(self.references.get_reference(id))
      .await?
      .ok_or(Error::NotFound(id))
  }

  pub(crate) async fn load_content(
    &self,
    reference: &AchievementReference,
  ) -> Result<AchievementContent> {
    self
      .call(self.contents.get(reference.content_id.clone()))
      .await?
      .ok_or_else(|| inconsistency(reference))
  }

  /// Append an audit row. Failure is logged, never surfaced: the status
  /// change it describes has already been committed.
  async fn record(&self, entry: NewHistoryEntry) {
    debug_assert!(
      is_legal_step(entry.previous_status, entry.new_status),
      "illegal history step {:?} -> {}",
      entry.previous_status,
      entry.new_status,
    );
    let reference_id = entry.reference_id;
    if let Err(e) = self.call(self.references.append_history(entry)).await {
      warn!(%reference_id, error = %e, "history append failed; status change stands");
    }
  }

  /// Apply a guarded status change and record it.
  async fn apply(
    &self,
    caller: &Caller,
    reference_id: Uuid,
    change: StatusChange,
    on_miss: impl FnOnce() -> Error,
  ) -> Result<AchievementReference> {
    let note = match &change {
      StatusChange::Reject { note, .. } => Some(note.clone()),
      _ => None,
    };
    let expected = change.expected_from();

    let updated = self
      .call(self.references.transition(reference_id, change))
      .await?
      .ok_or_else(on_miss)?;

    // Verify, Reject and RevertToDraft each admit exactly one prior status.
    // Submit records the status it observed itself and never comes here.
    let previous = match expected {
      [only] => *only,
      _ => AchievementStatus::Draft,
    };
    self.record_step(caller, reference_id, previous, updated.status, note).await;
    Ok(updated)
  }

  async fn record_step(
    &self,
    caller: &Caller,
    reference_id: Uuid,
    from: AchievementStatus,
    to: AchievementStatus,
    note: Option<String>,
  ) {
    info!(%reference_id, %from, %to, actor = %caller.user_id, "achievement transitioned");
    self
      .record(NewHistoryEntry {
        reference_id,
        previous_status: Some(from),
        new_status: to,
        changed_by: caller.user_id,
        note,
      })
      .await;
  }

  /// After an owner edit, move a rejected achievement back to draft.
  async fn revert_if_rejected(
    &self,
    caller: &Caller,
    reference: AchievementReference,
  ) -> Result<AchievementReference> {
    if reference.status != AchievementStatus::Rejected {
      return Ok(reference);
    }
    let id = reference.reference_id;
    self
      .apply(caller, id, StatusChange::RevertToDraft, || {
        Error::Conflict(format!("achievement {id} changed status concurrently"))
      })
      .await
  }

  // ── Create ────────────────────────────────────────────────────────────────

  /// Record a new achievement in [`AchievementStatus::Draft`].
  ///
  /// Content is written first. If the reference write then fails, the content
  /// is soft-deleted as compensation and the reference error is returned.
  /// A transient failure may hide a committed write, so the reference is
  /// looked up by its id first; content is only discarded once the reference
  /// is known to be absent.
  pub async fn create(
    &self,
    caller: &Caller,
    input: NewAchievement,
  ) -> Result<AchievementReference> {
    if !caller.is_student() {
      return Err(Error::Forbidden("only students can record achievements".into()));
    }

    let new_content = NewContent {
      owner_id:    caller.user_id,
      title:       input.title,
      description: input.description,
      details:     input.details,
      tags:        input.tags,
      points:      input.points,
    };
    new_content.validate()?;

    let content = self.call(self.contents.create(new_content)).await?;

    let reference_id = Uuid::new_v4();
    let new_reference = NewReference {
      reference_id,
      owner_id: caller.user_id,
      content_id: content.content_id.clone(),
    };
    let reference = match self.call(self.references.create_reference(new_reference)).await {
      Ok(reference) => reference,
      Err(e @ Error::Transient(_)) => {
        match self.call(self.references.get_reference(reference_id)).await {
          Ok(Some(reference)) => {
            warn!(%reference_id, error = %e, "reference write acknowledged late; keeping it");
            reference
          }
          Ok(None) => {
            warn!(content_id = %content.content_id, error = %e, "reference write failed; compensating");
            self.discard_content(&content.content_id).await;
            return Err(e);
          }
          Err(lookup) => {
            error!(
              %reference_id,
              content_id = %content.content_id,
              error = %e,
              lookup_error = %lookup,
              "reference write outcome unknown; content kept"
            );
            return Err(e);
          }
        }
      }
      Err(e) => {
        warn!(content_id = %content.content_id, error = %e, "reference write failed; compensating");
        self.discard_content(&content.content_id).await;
        return Err(e);
      }
    };

    info!(
      reference_id = %reference.reference_id,
      content_id = %reference.content_id,
      owner = %caller.user_id,
      "achievement created"
    );
    self
      .record(NewHistoryEntry {
        reference_id:    reference.reference_id,
        previous_status: None,
        new_status:      AchievementStatus::Draft,
        changed_by:      caller.user_id,
        note:            None,
      })
      .await;

    Ok(reference)
  }

  /// Best-effort soft delete of content no reference points at.
  async fn discard_content(&self, content_id: &ContentId) {
    match self.call(self.contents.soft_delete(content_id.clone())).await {
      Ok(true) => info!(%content_id, "orphaned content soft-deleted"),
      Ok(false) => warn!(%content_id, "orphaned content was already gone"),
      Err(e) => error!(%content_id, error = %e, "compensation failed; content left orphaned"),
    }
  }

  // ── Owner operations ──────────────────────────────────────────────────────

  /// Send a draft or rejected achievement for review.
  pub async fn submit(&self, caller: &Caller, reference_id: Uuid) -> Result<AchievementReference> {
    let reference = self.load_reference(reference_id).await?;
    ensure_owner(caller, &reference)?;
    ensure_permits(&reference, Action::Submit)?;

    let updated = self
      .call(self.references.transition(reference_id, StatusChange::Submit))
      .await?
      .ok_or_else(|| {
        Error::Conflict(format!("achievement {reference_id} changed status concurrently"))
      })?;

    self
      .record_step(caller, reference_id, reference.status, updated.status, None)
      .await;
    Ok(updated)
  }

  /// Overwrite the provided content fields. A rejected achievement returns
  /// to draft before the content changes.
  ///
  /// The status is read again after the write. If the achievement was
  /// submitted in between, the write is undone and the edit conflicts.
  pub async fn update(
    &self,
    caller: &Caller,
    reference_id: Uuid,
    patch: ContentPatch,
  ) -> Result<AchievementView> {
    patch.validate()?;

    let reference = self.load_reference(reference_id).await?;
    ensure_owner(caller, &reference)?;
    ensure_permits(&reference, Action::Edit)?;

    let original = self.load_content(&reference).await?;
    let mut content = original.clone();
    patch.apply_to(&mut content);

    let reference = self.revert_if_rejected(caller, reference).await?;
    let content = self
      .call(self.contents.update(reference.content_id.clone(), content))
      .await?
      .ok_or_else(|| inconsistency(&reference))?;

    let Some(reference) = self.still_editable(reference_id).await? else {
      self
        .undo_edit(reference_id, self.contents.update(original.content_id.clone(), original))
        .await;
      return Err(edited_concurrently(reference_id));
    };
    Ok(AchievementView::compose(reference, content))
  }

  /// Attach a file. Same guards and side effects as [`Self::update`].
  pub async fn add_attachment(
    &self,
    caller: &Caller,
    reference_id: Uuid,
    attachment: NewAttachment,
  ) -> Result<AchievementView> {
    attachment.validate()?;

    let reference = self.load_reference(reference_id).await?;
    ensure_owner(caller, &reference)?;
    ensure_permits(&reference, Action::Edit)?;

    let reference = self.revert_if_rejected(caller, reference).await?;
    let attachment = attachment.stamp(Utc::now());
    let content = self
      .call(
        self
          .contents
          .append_attachment(reference.content_id.clone(), attachment.clone()),
      )
      .await?
      .ok_or_else(|| inconsistency(&reference))?;

    let Some(reference) = self.still_editable(reference_id).await? else {
      self
        .undo_edit(
          reference_id,
          self.contents.remove_attachment(content.content_id.clone(), attachment),
        )
        .await;
      return Err(edited_concurrently(reference_id));
    };
    Ok(AchievementView::compose(reference, content))
  }

  /// Re-read the reference after a content write. `None` if it has left the
  /// editable states meanwhile.
  async fn still_editable(&self, reference_id: Uuid) -> Result<Option<AchievementReference>> {
    let current = self.load_reference(reference_id).await?;
    if current.status.permits(Action::Edit) {
      Ok(Some(current))
    } else {
      warn!(%reference_id, status = %current.status, "status changed during edit; rolling back");
      Ok(None)
    }
  }

  /// Best-effort rollback of a content write the status no longer allows.
  async fn undo_edit<F>(&self, reference_id: Uuid, undo: F)
  where
    F: Future<Output = Result<Option<AchievementContent>, C::Error>>,
  {
    match self.call(undo).await {
      Ok(Some(_)) => info!(%reference_id, "content edit rolled back"),
      Ok(None) => warn!(%reference_id, "content vanished before rollback"),
      Err(e) => error!(%reference_id, error = %e, "rollback failed; content keeps the late edit"),
    }
  }

  /// Remove a draft achievement: soft-delete the content, then delete the
  /// reference.
  pub async fn delete(&self, caller: &Caller, reference_id: Uuid) -> Result<()> {
    let reference = self.load_reference(reference_id).await?;
    ensure_owner(caller, &reference)?;
    ensure_permits(&reference, Action::Delete)?;

    let content_id = reference.content_id.clone();
    let soft_deleted = self.call(self.contents.soft_delete(content_id.clone())).await?;
    if !soft_deleted {
      warn!(%reference_id, %content_id, "content already missing; removing reference anyway");
    }

    let deleted = match self.remove_draft_reference(reference_id).await {
      Ok(deleted) => deleted,
      Err(e) => {
        // The content is already invisible to reads; the reference is left
        // in place for the caller to retry.
        error!(%reference_id, %content_id, error = %e, "reference delete failed after content soft delete");
        return Err(e);
      }
    };

    if !deleted {
      if soft_deleted {
        self.restore_content(&content_id).await;
      }
      return Err(Error::Conflict(format!(
        "achievement {reference_id} changed status concurrently"
      )));
    }

    info!(%reference_id, %content_id, owner = %caller.user_id, "achievement deleted");
    Ok(())
  }

  /// Delete the reference while it is still a draft. A transient failure is
  /// retried once. Returns `false` only if the reference still exists with
  /// another status.
  async fn remove_draft_reference(&self, reference_id: Uuid) -> Result<bool> {
    let first = self
      .call(self.references.delete_reference(reference_id, AchievementStatus::Draft))
      .await;
    let deleted = match first {
      Err(Error::Transient(reason)) => {
        warn!(%reference_id, %reason, "reference delete failed transiently; retrying");
        self
          .call(self.references.delete_reference(reference_id, AchievementStatus::Draft))
          .await?
      }
      other => other?,
    };
    if deleted {
      return Ok(true);
    }
    // A timed-out first attempt may have committed.
    Ok(self.call(self.references.get_reference(reference_id)).await?.is_none())
  }

  async fn restore_content(&self, content_id: &ContentId) {
    match self.call(self.contents.restore(content_id.clone())).await {
      Ok(_) => info!(%content_id, "content restored after lost delete race"),
      Err(e) => error!(%content_id, error = %e, "failed to restore content after lost delete race"),
    }
  }

  // ── Reviewer operations ───────────────────────────────────────────────────

  /// Accept a submitted achievement. Terminal.
  pub async fn verify(&self, caller: &Caller, reference_id: Uuid) -> Result<AchievementReference> {
    ensure_reviewer(caller)?;
    self
      .apply(
        caller,
        reference_id,
        StatusChange::Verify { reviewer: caller.user_id },
        || already_processed(reference_id),
      )
      .await
  }

  /// Send a submitted achievement back to its owner with a note.
  pub async fn reject(
    &self,
    caller: &Caller,
    reference_id: Uuid,
    note: &str,
  ) -> Result<AchievementReference> {
    ensure_reviewer(caller)?;
    let note = note.trim();
    if note.is_empty() {
      return Err(Error::Validation("a rejection note is required".into()));
    }
    self
      .apply(
        caller,
        reference_id,
        StatusChange::Reject { reviewer: caller.user_id, note: note.to_owned() },
        || already_processed(reference_id),
      )
      .await
  }
}

// ─── Guards ──────────────────────────────────────────────────────────────────

fn ensure_owner(caller: &Caller, reference: &AchievementReference) -> Result<()> {
  if caller.user_id == reference.owner_id {
    Ok(())
  } else {
    Err(Error::Forbidden(format!(
      "achievement {} belongs to another student",
      reference.reference_id
    )))
  }
}

fn ensure_reviewer(caller: &Caller) -> Result<()> {
  if caller.has_reviewer_authority() {
    Ok(())
  } else {
    Err(Error::Forbidden("reviewer authority required".into()))
  }
}

fn ensure_permits(reference: &AchievementReference, action: Action) -> Result<()> {
  if reference.status.permits(action) {
    Ok(())
  } else {
    Err(Error::Conflict(format!(
      "cannot {action} achievement {} while it is {}",
      reference.reference_id, reference.status
    )))
  }
}

fn edited_concurrently(reference_id: Uuid) -> Error {
  Error::Conflict(format!("achievement {reference_id} was submitted during the edit"))
}

/// Verify/Reject deliberately do not say which of the two happened.
fn already_processed(reference_id: Uuid) -> Error {
  Error::Conflict(format!("achievement {reference_id} not found or already processed"))
}

pub(crate) fn inconsistency(reference: &AchievementReference) -> Error {
  Error::StoreInconsistency {
    reference_id: reference.reference_id,
    content_id:   reference.content_id.clone(),
  }
}

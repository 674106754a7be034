//! Read-side composition: references joined with their content.

use std::collections::HashMap;

use laurel_core::{
  caller::Caller,
  content::ContentId,
  lifecycle::{AchievementStatus, AchievementView, HistoryEntry},
  store::{ContentStore, ReferenceFilter, ReferenceStore},
};
use tracing::warn;
use uuid::Uuid;

use crate::{Error, LifecycleEngine, Result};

impl<C, R> LifecycleEngine<C, R>
where
  C: ContentStore,
  R: ReferenceStore,
{
  /// One achievement with its content. Students may only read their own.
  pub async fn get_by_id(&self, caller: &Caller, reference_id: Uuid) -> Result<AchievementView> {
    let reference = self.load_reference(reference_id).await?;
    if !caller.can_view(reference.owner_id) {
      return Err(Error::Forbidden(format!(
        "achievement {reference_id} belongs to another student"
      )));
    }
    let content = self.load_content(&reference).await?;
    Ok(AchievementView::compose(reference, content))
  }

  /// The caller's own achievements, newest first.
  pub async fn list_mine(
    &self,
    caller: &Caller,
    status: Option<AchievementStatus>,
  ) -> Result<Vec<AchievementView>> {
    self
      .list(&ReferenceFilter { owner_id: Some(caller.user_id), status, ..Default::default() })
      .await
  }

  /// Any student's achievements. Reviewer authority required.
  pub async fn list_all(
    &self,
    caller: &Caller,
    filter: &ReferenceFilter,
  ) -> Result<Vec<AchievementView>> {
    if !caller.has_reviewer_authority() {
      return Err(Error::Forbidden("reviewer authority required".into()));
    }
    self.list(filter).await
  }

  /// The review queue: everything currently submitted.
  pub async fn list_pending(
    &self,
    caller: &Caller,
    limit: Option<usize>,
    offset: Option<usize>,
  ) -> Result<Vec<AchievementView>> {
    let filter = ReferenceFilter {
      owner_id: None,
      status: Some(AchievementStatus::Submitted),
      limit,
      offset,
    };
    self.list_all(caller, &filter).await
  }

  /// Status history of one achievement, oldest first. Unknown ids yield an
  /// empty list.
  pub async fn list_history(
    &self,
    caller: &Caller,
    reference_id: Uuid,
  ) -> Result<Vec<HistoryEntry>> {
    if caller.is_student() {
      match self.call(self.references.get_reference(reference_id)).await? {
        Some(reference) if !caller.can_view(reference.owner_id) => {
          return Err(Error::Forbidden(format!(
            "achievement {reference_id} belongs to another student"
          )));
        }
        _ => {}
      }
    }
    self.call(self.references.list_history(reference_id)).await
  }

  /// Fetch references, then all their content in one batch. References whose
  /// content is missing are left out of the result.
  async fn list(&self, filter: &ReferenceFilter) -> Result<Vec<AchievementView>> {
    let references = self.call(self.references.list_references(filter)).await?;
    if references.is_empty() {
      return Ok(Vec::new());
    }

    let ids: Vec<ContentId> = references.iter().map(|r| r.content_id.clone()).collect();
    let mut by_id: HashMap<ContentId, _> = self
      .call(self.contents.get_many(&ids))
      .await?
      .into_iter()
      .map(|c| (c.content_id.clone(), c))
      .collect();

    Ok(
      references
        .into_iter()
        .filter_map(|reference| match by_id.remove(&reference.content_id) {
          Some(content) => Some(AchievementView::compose(reference, content)),
          None => {
            warn!(
              reference_id = %reference.reference_id,
              content_id = %reference.content_id,
              "reference has no content; omitted from listing"
            );
            None
          }
        })
        .collect(),
    )
  }
}

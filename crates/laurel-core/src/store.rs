//! The `ContentStore` and `ReferenceStore` traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g.
//! `laurel-store-sqlite`). The lifecycle engine depends on these abstractions,
//! not on any concrete backend, and receives its store handles by value at
//! construction time.

use std::future::Future;

use uuid::Uuid;

use crate::{
  content::{AchievementContent, Attachment, ContentId, NewContent},
  lifecycle::{
    AchievementReference, AchievementStatus, HistoryEntry, NewHistoryEntry, NewReference,
    StatusChange,
  },
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Bound for backend error types.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// Whether the same call may succeed if retried unchanged (the backend was
  /// busy or unreachable).
  fn is_transient(&self) -> bool;
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`ReferenceStore::list_references`]. Results are ordered
/// newest first.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFilter {
  pub owner_id: Option<Uuid>,
  pub status:   Option<AchievementStatus>,
  pub limit:    Option<usize>,
  pub offset:   Option<usize>,
}

// ─── Content store ───────────────────────────────────────────────────────────

/// Storage for achievement content.
///
/// Every read excludes soft-deleted records; "missing" and "soft-deleted"
/// are indistinguishable to callers.
pub trait ContentStore: Send + Sync {
  type Error: StoreError;

  /// Persist new content. The store assigns the [`ContentId`] and timestamps.
  fn create(
    &self,
    input: NewContent,
  ) -> impl Future<Output = Result<AchievementContent, Self::Error>> + Send + '_;

  fn get(
    &self,
    id: ContentId,
  ) -> impl Future<Output = Result<Option<AchievementContent>, Self::Error>> + Send + '_;

  /// Fetch several records at once. Ids that are missing or soft-deleted are
  /// omitted. An empty `ids` slice never reaches the backend.
  fn get_many<'a>(
    &'a self,
    ids: &'a [ContentId],
  ) -> impl Future<Output = Result<Vec<AchievementContent>, Self::Error>> + Send + 'a;

  /// Overwrite the descriptive fields of `id` with those of `content`.
  /// Ownership, attachments and `created_at` are left untouched. Returns
  /// `None` if the record is missing or soft-deleted.
  fn update(
    &self,
    id: ContentId,
    content: AchievementContent,
  ) -> impl Future<Output = Result<Option<AchievementContent>, Self::Error>> + Send + '_;

  /// Append one attachment. Returns `None` if the record is missing or
  /// soft-deleted.
  fn append_attachment(
    &self,
    id: ContentId,
    attachment: Attachment,
  ) -> impl Future<Output = Result<Option<AchievementContent>, Self::Error>> + Send + '_;

  /// Drop every attachment equal to `attachment`, keeping the order of the
  /// rest. Returns `None` if the record is missing or soft-deleted.
  fn remove_attachment(
    &self,
    id: ContentId,
    attachment: Attachment,
  ) -> impl Future<Output = Result<Option<AchievementContent>, Self::Error>> + Send + '_;

  /// Mark a record deleted. Returns `false` if it was missing or already
  /// soft-deleted.
  fn soft_delete(
    &self,
    id: ContentId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Undo a soft delete. Returns `false` if no soft-deleted record exists.
  fn restore(
    &self,
    id: ContentId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Reference store ─────────────────────────────────────────────────────────

/// Storage for workflow references and their audit trail.
pub trait ReferenceStore: Send + Sync {
  type Error: StoreError;

  /// Persist a new reference in [`AchievementStatus::Draft`].
  fn create_reference(
    &self,
    input: NewReference,
  ) -> impl Future<Output = Result<AchievementReference, Self::Error>> + Send + '_;

  fn get_reference(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AchievementReference>, Self::Error>> + Send + '_;

  fn list_references<'a>(
    &'a self,
    filter: &'a ReferenceFilter,
  ) -> impl Future<Output = Result<Vec<AchievementReference>, Self::Error>> + Send + 'a;

  /// Apply `change` as a single atomic write guarded by
  /// `status IN change.expected_from()`.
  ///
  /// Returns the updated row, or `None` if the reference does not exist or
  /// its status no longer matches the guard. The two cases are deliberately
  /// not distinguished.
  fn transition(
    &self,
    id: Uuid,
    change: StatusChange,
  ) -> impl Future<Output = Result<Option<AchievementReference>, Self::Error>> + Send + '_;

  /// Delete the reference if its status is still `expected`. Returns `false`
  /// otherwise.
  fn delete_reference(
    &self,
    id: Uuid,
    expected: AchievementStatus,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Append one audit row. Rows are never updated.
  fn append_history(
    &self,
    entry: NewHistoryEntry,
  ) -> impl Future<Output = Result<HistoryEntry, Self::Error>> + Send + '_;

  /// All audit rows for `reference_id`, oldest first.
  fn list_history(
    &self,
    reference_id: Uuid,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send + '_;
}

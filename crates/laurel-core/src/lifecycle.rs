//! Workflow status, reference records, and the audit trail.
//!
//! The reference is the single source of truth for an achievement's status.
//! Every change to it is expressed as a [`StatusChange`] that the reference
//! store applies as one conditional write, guarded by the statuses the
//! change may start from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  content::{AchievementContent, ContentId},
};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
  strum::IntoStaticStr,
  strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AchievementStatus {
  Draft,
  Submitted,
  Verified,
  Rejected,
}

impl AchievementStatus {
  /// Parse the discriminant stored in the `status` column.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
  }

  /// `Verified` has no outgoing transition.
  pub fn is_terminal(self) -> bool { matches!(self, Self::Verified) }

  /// Whether the owner may still change content while in this status.
  pub fn is_editable(self) -> bool { matches!(self, Self::Draft | Self::Rejected) }

  pub fn permits(self, action: Action) -> bool { action.allowed_from().contains(&self) }
}

// ─── Actions ─────────────────────────────────────────────────────────────────

/// Something a caller asks to do to an existing achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
  Submit,
  Edit,
  Verify,
  Reject,
  Delete,
}

impl Action {
  pub fn allowed_from(self) -> &'static [AchievementStatus] {
    use AchievementStatus::*;
    match self {
      Self::Submit | Self::Edit => &[Draft, Rejected],
      Self::Verify | Self::Reject => &[Submitted],
      Self::Delete => &[Draft],
    }
  }
}

/// Whether `to` may directly follow `from` in a reference's history.
/// `from == None` is the creation event.
pub fn is_legal_step(from: Option<AchievementStatus>, to: AchievementStatus) -> bool {
  use AchievementStatus::*;
  matches!(
    (from, to),
    (None, Draft)
      | (Some(Draft | Rejected), Submitted)
      | (Some(Rejected), Draft)
      | (Some(Submitted), Verified | Rejected)
  )
}

/// Whether a sequence of `(previous, new)` history pairs forms a connected,
/// legal path starting at creation.
pub fn is_legal_path<I>(steps: I) -> bool
where
  I: IntoIterator<Item = (Option<AchievementStatus>, AchievementStatus)>,
{
  let mut current: Option<AchievementStatus> = None;
  for (from, to) in steps {
    if from != current || !is_legal_step(from, to) {
      return false;
    }
    current = Some(to);
  }
  true
}

// ─── Conditional writes ──────────────────────────────────────────────────────

/// A status mutation, applied by the reference store only while the
/// reference is in one of [`StatusChange::expected_from`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
  /// Sets `submitted_at`.
  Submit,
  /// Implicit transition when a rejected achievement is edited. Clears
  /// `submitted_at`.
  RevertToDraft,
  /// Sets `verified_at` and `verified_by`.
  Verify { reviewer: Uuid },
  /// Sets `verified_at`, `verified_by` and `rejection_note`.
  Reject { reviewer: Uuid, note: String },
}

impl StatusChange {
  pub fn target(&self) -> AchievementStatus {
    match self {
      Self::Submit => AchievementStatus::Submitted,
      Self::RevertToDraft => AchievementStatus::Draft,
      Self::Verify { .. } => AchievementStatus::Verified,
      Self::Reject { .. } => AchievementStatus::Rejected,
    }
  }

  pub fn expected_from(&self) -> &'static [AchievementStatus] {
    match self {
      Self::Submit => Action::Submit.allowed_from(),
      Self::RevertToDraft => &[AchievementStatus::Rejected],
      Self::Verify { .. } => Action::Verify.allowed_from(),
      Self::Reject { .. } => Action::Reject.allowed_from(),
    }
  }
}

// ─── Reference ───────────────────────────────────────────────────────────────

/// The authoritative workflow record of one achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementReference {
  pub reference_id:   Uuid,
  pub owner_id:       Uuid,
  pub content_id:     ContentId,
  pub status:         AchievementStatus,
  pub submitted_at:   Option<DateTime<Utc>>,
  pub verified_at:    Option<DateTime<Utc>>,
  pub verified_by:    Option<Uuid>,
  pub rejection_note: Option<String>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// Input to [`crate::store::ReferenceStore::create_reference`]. New references
/// always start in [`AchievementStatus::Draft`].
///
/// The id is chosen by the caller so an unacknowledged write can be looked up
/// afterwards.
#[derive(Debug, Clone)]
pub struct NewReference {
  pub reference_id: Uuid,
  pub owner_id:     Uuid,
  pub content_id:   ContentId,
}

// ─── History ─────────────────────────────────────────────────────────────────

/// One row of the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub history_id:      Uuid,
  pub reference_id:    Uuid,
  /// `None` for the creation event.
  pub previous_status: Option<AchievementStatus>,
  pub new_status:      AchievementStatus,
  pub changed_by:      Uuid,
  pub note:            Option<String>,
  pub created_at:      DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
  pub reference_id:    Uuid,
  pub previous_status: Option<AchievementStatus>,
  pub new_status:      AchievementStatus,
  pub changed_by:      Uuid,
  pub note:            Option<String>,
}

// ─── Composed view ───────────────────────────────────────────────────────────

/// A reference joined with its content. Never stored, always assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementView {
  pub reference_id:   Uuid,
  pub content:        AchievementContent,
  pub status:         AchievementStatus,
  pub submitted_at:   Option<DateTime<Utc>>,
  pub verified_at:    Option<DateTime<Utc>>,
  pub verified_by:    Option<Uuid>,
  pub rejection_note: Option<String>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

impl AchievementView {
  pub fn compose(reference: AchievementReference, content: AchievementContent) -> Self {
    Self {
      reference_id:   reference.reference_id,
      content,
      status:         reference.status,
      submitted_at:   reference.submitted_at,
      verified_at:    reference.verified_at,
      verified_by:    reference.verified_by,
      rejection_note: reference.rejection_note,
      created_at:     reference.created_at,
      updated_at:     reference.updated_at,
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;
  use AchievementStatus::*;

  #[test]
  fn status_roundtrips_through_column_text() {
    for status in AchievementStatus::iter() {
      assert_eq!(AchievementStatus::parse(status.as_ref()).unwrap(), status);
      let column: &'static str = status.into();
      assert_eq!(column, status.to_string());
      assert_eq!(serde_json::to_value(status).unwrap(), column);
    }
    assert!(matches!(
      AchievementStatus::parse("archived"),
      Err(Error::UnknownStatus(_))
    ));
  }

  #[test]
  fn verified_permits_nothing() {
    assert!(Verified.is_terminal());
    for action in [Action::Submit, Action::Edit, Action::Verify, Action::Reject, Action::Delete] {
      assert!(!Verified.permits(action), "{action} allowed from verified");
    }
  }

  #[test]
  fn delete_only_from_draft() {
    assert!(Draft.permits(Action::Delete));
    assert!(!Rejected.permits(Action::Delete));
    assert!(!Submitted.permits(Action::Delete));
  }

  #[test]
  fn every_change_targets_a_legal_step() {
    let reviewer = Uuid::new_v4();
    let changes = [
      StatusChange::Submit,
      StatusChange::RevertToDraft,
      StatusChange::Verify { reviewer },
      StatusChange::Reject { reviewer, note: "incomplete".into() },
    ];
    for change in changes {
      for from in change.expected_from() {
        assert!(
          is_legal_step(Some(*from), change.target()),
          "{from} -> {}",
          change.target()
        );
      }
    }
  }

  #[test]
  fn full_scenario_is_a_legal_path() {
    let path = [
      (None, Draft),
      (Some(Draft), Submitted),
      (Some(Submitted), Rejected),
      (Some(Rejected), Draft),
      (Some(Draft), Submitted),
      (Some(Submitted), Verified),
    ];
    assert!(is_legal_path(path));
  }

  #[test]
  fn disconnected_or_illegal_paths_are_rejected() {
    assert!(!is_legal_path([(Some(Draft), Submitted)]));
    assert!(!is_legal_path([(None, Draft), (Some(Submitted), Verified)]));
    assert!(!is_legal_path([(None, Draft), (Some(Draft), Verified)]));
    assert!(!is_legal_path([(None, Submitted)]));
  }
}

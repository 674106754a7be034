//! The authenticated caller, as supplied by the transport layer.
//!
//! Identity verification happens before a [`Caller`] is built; the core trusts
//! it completely.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Student,
  Reviewer,
  Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
  pub user_id: Uuid,
  pub role:    Role,
}

impl Caller {
  pub fn student(user_id: Uuid) -> Self { Self { user_id, role: Role::Student } }

  pub fn reviewer(user_id: Uuid) -> Self { Self { user_id, role: Role::Reviewer } }

  pub fn is_student(&self) -> bool { self.role == Role::Student }

  /// Reviewers and admins may verify, reject, and list every achievement.
  pub fn has_reviewer_authority(&self) -> bool {
    matches!(self.role, Role::Reviewer | Role::Admin)
  }

  /// Whether this caller may read an achievement owned by `owner_id`.
  pub fn can_view(&self, owner_id: Uuid) -> bool {
    self.has_reviewer_authority() || self.user_id == owner_id
  }
}

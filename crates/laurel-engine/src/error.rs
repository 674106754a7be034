//! The error taxonomy exposed by the lifecycle engine.
//!
//! Store errors never cross this boundary in their own shape; they are
//! translated into [`Error::Transient`] or [`Error::Store`] by
//! [`Error::from_store`].

use laurel_core::{content::ContentId, store::StoreError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed input. Retrying the same request cannot succeed.
  #[error("invalid input: {0}")]
  Validation(String),

  /// The caller is not the owner, or lacks reviewer authority.
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("achievement {0} not found")]
  NotFound(Uuid),

  /// A status guard failed: the transition is illegal from the current
  /// status, or a concurrent actor changed it first.
  #[error("conflict: {0}")]
  Conflict(String),

  /// A reference points at content that cannot be loaded.
  #[error("achievement {reference_id} points at content {content_id} that cannot be loaded")]
  StoreInconsistency {
    reference_id: Uuid,
    content_id:   ContentId,
  },

  /// The store timed out or was unreachable. Safe to retry.
  #[error("store unavailable: {0}")]
  Transient(String),

  /// Any other backend failure.
  #[error("store failure: {0}")]
  Store(String),
}

impl Error {
  pub fn from_store<E: StoreError>(e: E) -> Self {
    if e.is_transient() {
      Self::Transient(e.to_string())
    } else {
      Self::Store(e.to_string())
    }
  }

  /// Stable, transport-independent name of the error kind.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Validation(_) => "validation",
      Self::Forbidden(_) => "forbidden",
      Self::NotFound(_) => "not_found",
      Self::Conflict(_) => "conflict",
      Self::StoreInconsistency { .. } => "store_inconsistency",
      Self::Transient(_) => "transient",
      Self::Store(_) => "store",
    }
  }

  /// Whether the same request may succeed if sent again unchanged.
  pub fn is_retryable(&self) -> bool { matches!(self, Self::Transient(_) | Self::Conflict(_)) }
}

/// Input checks become [`Error::Validation`]; decoding failures mean stored
/// data is unreadable and become [`Error::Store`].
impl From<laurel_core::Error> for Error {
  fn from(e: laurel_core::Error) -> Self {
    use laurel_core::Error as Core;
    match e {
      Core::EmptyField(_) | Core::EmptyAttachmentUrl(_) | Core::EmptyPatch => {
        Self::Validation(e.to_string())
      }
      Core::UnknownStatus(_) | Core::UnknownCategory(_) | Core::Serialization(_) => {
        Self::Store(e.to_string())
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

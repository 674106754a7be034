//! Error types for `laurel-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("field `{0}` must not be empty")]
  EmptyField(&'static str),

  #[error("unknown achievement status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown achievement category: {0:?}")]
  UnknownCategory(String),

  #[error("attachment `{0}` has an empty url")]
  EmptyAttachmentUrl(String),

  #[error("update contains no fields")]
  EmptyPatch,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error type for `laurel-store-sqlite`.

use laurel_core::store::StoreError;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] laurel_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl StoreError for Error {
  fn is_transient(&self) -> bool {
    match self {
      Error::Database(tokio_rusqlite::Error::ConnectionClosed) => true,
      Error::Database(tokio_rusqlite::Error::Rusqlite(e)) => matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
      ),
      _ => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

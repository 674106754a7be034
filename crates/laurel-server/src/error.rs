//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error(transparent)]
  Engine(#[from] laurel_engine::Error),
}

impl Error {
  pub fn status(&self) -> StatusCode {
    use laurel_engine::Error as E;
    match self {
      Error::Unauthorized => StatusCode::UNAUTHORIZED,
      Error::Engine(e) => match e {
        E::Validation(_) => StatusCode::BAD_REQUEST,
        E::Forbidden(_) => StatusCode::FORBIDDEN,
        E::NotFound(_) => StatusCode::NOT_FOUND,
        E::Conflict(_) => StatusCode::CONFLICT,
        E::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        E::StoreInconsistency { .. } | E::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      Error::Unauthorized => "unauthorized",
      Error::Engine(e) => e.kind(),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let body = Json(json!({ "error": self.kind(), "message": self.to_string() }));
    let mut res = (status, body).into_response();
    if matches!(self, Error::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"laurel\""),
      );
    }
    res
  }
}

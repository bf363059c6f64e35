//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use pacto_core::ValidationError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  /// Another change to the same commitment is running.
  #[error("{0}")]
  Busy(String),

  /// Part of a multi-step change was committed.
  #[error("{0}")]
  PartialFailure(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

impl From<pacto_core::Error> for ApiError {
  fn from(err: pacto_core::Error) -> Self {
    use pacto_core::Error;
    match err {
      Error::Validation(v) => Self::Validation(v),
      Error::TermNotFound(id) => Self::NotFound(format!("term {id} not found")),
      Error::MutationInProgress(_) => Self::Busy(err.to_string()),
      Error::PartialFailure { .. } => Self::PartialFailure(err.to_string()),
      Error::Persistence(source) => Self::Store(source),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Busy(_) => StatusCode::CONFLICT,
      ApiError::PartialFailure(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match &self {
      ApiError::NotFound(m) | ApiError::BadRequest(m) => m.clone(),
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

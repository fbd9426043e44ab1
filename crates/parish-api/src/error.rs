//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use parish_core::{ErrorKind, store::StoreError};
use serde_json::{Value, json};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A domain rule refused the request.
  #[error("{message}")]
  Domain {
    kind:    ErrorKind,
    message: String,
    /// Extra machine-readable fields merged into the response body.
    detail:  Option<Value>,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("export error: {0}")]
  Export(#[from] csv::Error),
}

impl ApiError {
  /// Classify a backend error: wrapped domain errors keep their kind, the
  /// rest become 500s.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    match e.domain() {
      Some(domain) => Self::from(domain),
      None => Self::Store(Box::new(e)),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Domain { kind, .. } => match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::CapacityExhausted => StatusCode::SERVICE_UNAVAILABLE,
      },
      Self::Store(_) | Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<&parish_core::Error> for ApiError {
  fn from(e: &parish_core::Error) -> Self {
    let detail = match e {
      parish_core::Error::Overdraft { requested, remaining } => {
        Some(json!({ "requested": requested, "remaining": remaining }))
      }
      _ => None,
    };
    Self::Domain { kind: e.kind(), message: e.to_string(), detail }
  }
}

impl From<parish_core::Error> for ApiError {
  fn from(e: parish_core::Error) -> Self { Self::from(&e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let mut body = json!({ "error": self.to_string() });
    if let (Self::Domain { detail: Some(Value::Object(extra)), .. }, Value::Object(map)) =
      (&self, &mut body)
    {
      map.extend(extra.clone());
    }
    (status, Json(body)).into_response()
  }
}

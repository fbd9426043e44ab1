//! Errors raised by the server layer before a request reaches the API.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("{username} may not {method} this resource")]
  Forbidden { username: String, method: String },
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"parish\""),
        );
        res
      }
      Error::Forbidden { .. } => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
    }
  }
}

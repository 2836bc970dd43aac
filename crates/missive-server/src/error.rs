//! HTTP error type and axum `IntoResponse` implementation.
//!
//! Workflow errors the caller can fix map to 4xx with a readable message.
//! Infrastructure failures are logged here and answered with a generic 500
//! so internals never reach the client.

use axum::{
  Json,
  extract::rejection::{FormRejection, JsonRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use missive_core::oauth::AuthError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Workflow(#[from] missive_core::Error),

  #[error("malformed request: {0}")]
  BadRequest(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("not found")]
  NotFound,
}

impl From<JsonRejection> for Error {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<FormRejection> for Error {
  fn from(rejection: FormRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for Error {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

fn body(status: StatusCode, message: impl Into<String>) -> Response {
  (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    use missive_core::Error as W;

    match self {
      Error::Workflow(e) => match e {
        W::InvalidInput(m) => body(StatusCode::BAD_REQUEST, m),
        W::MissingToken => body(StatusCode::BAD_REQUEST, e.to_string()),
        W::AlreadySubscribed => body(StatusCode::CONFLICT, e.to_string()),
        W::InvalidToken => body(StatusCode::NOT_FOUND, e.to_string()),
        W::UnknownOrUnverifiedSubscriber => body(StatusCode::UNAUTHORIZED, e.to_string()),
        W::AuthProvider(AuthError::UnknownProvider(p)) => {
          body(StatusCode::NOT_FOUND, format!("unknown login provider {p:?}"))
        }
        W::AuthProvider(err) => {
          tracing::error!(error = %err, "social login failed");
          body(StatusCode::INTERNAL_SERVER_ERROR, "login failed")
        }
        W::TokenCollision | W::Storage(_) => {
          tracing::error!(error = %e, "request failed");
          body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
      },
      Error::BadRequest(m) => body(StatusCode::BAD_REQUEST, m),
      Error::Unauthorized => {
        let mut res = body(StatusCode::UNAUTHORIZED, "unauthorized");
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"missive\""),
        );
        res
      }
      Error::NotFound => body(StatusCode::NOT_FOUND, "not found"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use missive_core::Error as W;

  fn status(e: impl Into<Error>) -> StatusCode { e.into().into_response().status() }

  #[test]
  fn workflow_errors_map_to_statuses() {
    assert_eq!(status(W::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
    assert_eq!(status(W::MissingToken), StatusCode::BAD_REQUEST);
    assert_eq!(status(W::AlreadySubscribed), StatusCode::CONFLICT);
    assert_eq!(status(W::InvalidToken), StatusCode::NOT_FOUND);
    assert_eq!(status(W::UnknownOrUnverifiedSubscriber), StatusCode::UNAUTHORIZED);
    assert_eq!(status(W::TokenCollision), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
      status(W::AuthProvider(AuthError::StateMismatch)),
      StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
      status(W::AuthProvider(AuthError::UnknownProvider("myspace".into()))),
      StatusCode::NOT_FOUND
    );
  }

  #[tokio::test]
  async fn storage_error_does_not_leak_details() {
    let err = W::Storage("disk I/O error at /var/lib/missive.db".into());
    let res = Error::from(err).into_response();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains("/var/lib"));
  }

  #[test]
  fn unauthorized_challenges_for_basic() {
    let res = Error::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
  }
}

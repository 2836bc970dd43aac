//! axum handlers, one module per endpoint family.

pub mod admin;
pub mod oauth;
pub mod submit;
pub mod subscribe;

use axum::{
  Form, Json,
  extract::{FromRequest, Request},
  http::header,
};
use serde::de::DeserializeOwned;

use crate::error::Error;

/// A request body sent either as JSON or as an HTML form
/// (`application/x-www-form-urlencoded`), chosen by `Content-Type`.
pub struct Payload<T>(pub T);

fn is_form(req: &Request) -> bool {
  req
    .headers()
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|ct| {
      ct.trim_start()
        .to_ascii_lowercase()
        .starts_with("application/x-www-form-urlencoded")
    })
}

impl<T, St> FromRequest<St> for Payload<T>
where
  T: DeserializeOwned,
  St: Send + Sync,
{
  type Rejection = Error;

  async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
    if is_form(&req) {
      let Form(value) = Form::<T>::from_request(req, state).await?;
      Ok(Self(value))
    } else {
      let Json(value) = Json::<T>::from_request(req, state).await?;
      Ok(Self(value))
    }
  }
}

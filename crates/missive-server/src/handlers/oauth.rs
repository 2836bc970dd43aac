//! `GET /auth/{provider}` and `GET /auth/{provider}/callback`.
//!
//! The CSRF state travels in an HttpOnly cookie scoped to `/auth`, tagged
//! with the provider it was issued for.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, HeaderValue, header},
  response::{IntoResponse, Redirect, Response},
};
use missive_core::{Resolved, oauth::{CallbackParams, OAuthAdapter}, store::IdentityStore};

use crate::{AppState, error::Error};

pub const STATE_COOKIE: &str = "missive_oauth_state";
const STATE_MAX_AGE_SECS: u32 = 600;

fn state_cookie(value: &str, max_age: u32, secure: bool) -> Result<HeaderValue, Error> {
  let secure = if secure { "; Secure" } else { "" };
  HeaderValue::from_str(&format!(
    "{STATE_COOKIE}={value}; Path=/auth; Max-Age={max_age}; HttpOnly; SameSite=Lax{secure}"
  ))
  .map_err(|_| Error::BadRequest("unrepresentable cookie value".to_owned()))
}

/// The state stored for `provider`, if the request carries one.
pub fn expected_state<'h>(headers: &'h HeaderMap, provider: &str) -> Option<&'h str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == STATE_COOKIE)
    .and_then(|(_, value)| value.split_once('.'))
    .filter(|(p, _)| *p == provider)
    .map(|(_, state)| state)
}

pub async fn begin<S, A>(
  State(state): State<AppState<S, A>>,
  Path(provider): Path<String>,
) -> Result<Response, Error>
where
  S: IdentityStore + 'static,
  A: OAuthAdapter + 'static,
{
  let redirect = state.social.begin(&provider)?;
  let cookie = state_cookie(
    &format!("{provider}.{}", redirect.state),
    STATE_MAX_AGE_SECS,
    state.config.secure_cookies(),
  )?;

  let mut res = Redirect::to(&redirect.url).into_response();
  res.headers_mut().insert(header::SET_COOKIE, cookie);
  Ok(res)
}

pub async fn callback<S, A>(
  State(state): State<AppState<S, A>>,
  Path(provider): Path<String>,
  headers: HeaderMap,
  Query(params): Query<CallbackParams>,
) -> Result<Response, Error>
where
  S: IdentityStore + 'static,
  A: OAuthAdapter + 'static,
{
  let expected = expected_state(&headers, &provider);
  let outcome: Result<Resolved, _> = state.social.complete(&provider, &params, expected).await;

  // The state is single use: expire it whether or not the login went through.
  let mut res = match outcome {
    Ok(resolved) => Json(resolved).into_response(),
    Err(e) => Error::from(e).into_response(),
  };
  res
    .headers_mut()
    .insert(header::SET_COOKIE, state_cookie("", 0, state.config.secure_cookies())?);
  Ok(res)
}

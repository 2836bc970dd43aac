//! `GET /admin/subscribers`: confirmed subscribers, behind Basic auth.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use missive_core::{oauth::OAuthAdapter, store::IdentityStore};
use serde::Serialize;

use crate::{AppState, auth::Admin, error::Error};

#[derive(Serialize)]
pub struct ConfirmedEntry {
  pub email:        String,
  pub confirmed_at: Option<DateTime<Utc>>,
}

pub async fn subscribers<S, A>(
  _admin: Admin,
  State(state): State<AppState<S, A>>,
) -> Result<Json<Vec<ConfirmedEntry>>, Error>
where
  S: IdentityStore + 'static,
  A: OAuthAdapter + 'static,
{
  let list = state.subscriptions.confirmed().await?;
  Ok(Json(
    list
      .into_iter()
      .map(|s| ConfirmedEntry { email: s.email, confirmed_at: s.confirmed_at })
      .collect(),
  ))
}

//! `POST /subscribe`, `GET /verify` and `POST /resend`.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
  http::StatusCode,
};
use missive_core::{oauth::OAuthAdapter, store::IdentityStore};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, error::Error, handlers::Payload};

#[derive(Deserialize)]
pub struct EmailBody {
  pub email: String,
}

#[derive(Deserialize)]
pub struct VerifyQuery {
  pub token: Option<String>,
}

pub async fn subscribe<S, A>(
  State(state): State<AppState<S, A>>,
  Payload(body): Payload<EmailBody>,
) -> Result<Json<Value>, Error>
where
  S: IdentityStore + 'static,
  A: OAuthAdapter + 'static,
{
  let subscriber = state.subscriptions.start(&body.email).await?;
  Ok(Json(json!({
    "email": subscriber.email,
    "status": "pending",
    "message": "Subscription started. Please check your email to confirm.",
  })))
}

pub async fn verify<S, A>(
  State(state): State<AppState<S, A>>,
  query: Result<Query<VerifyQuery>, QueryRejection>,
) -> Result<Json<Value>, Error>
where
  S: IdentityStore + 'static,
  A: OAuthAdapter + 'static,
{
  let Query(query) = query?;
  let token = query.token.unwrap_or_default();
  let subscriber = state.subscriptions.verify(&token).await?;
  Ok(Json(json!({
    "email": subscriber.email,
    "status": "confirmed",
  })))
}

/// Always 202 for a well-formed address, so the endpoint does not reveal
/// who is subscribed.
pub async fn resend<S, A>(
  State(state): State<AppState<S, A>>,
  Payload(body): Payload<EmailBody>,
) -> Result<(StatusCode, Json<Value>), Error>
where
  S: IdentityStore + 'static,
  A: OAuthAdapter + 'static,
{
  state.subscriptions.resend(&body.email).await?;
  Ok((
    StatusCode::ACCEPTED,
    Json(json!({ "message": "If that address is awaiting confirmation, a new link is on its way." })),
  ))
}

//! `POST /submit`: message intake from confirmed subscribers.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use missive_core::{oauth::OAuthAdapter, store::IdentityStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::Error, handlers::Payload};

#[derive(Deserialize)]
pub struct SubmitBody {
  pub email:   String,
  pub message: String,
}

#[derive(Serialize)]
pub struct Submitted {
  pub message_id: Uuid,
  pub created_at: DateTime<Utc>,
}

pub async fn submit<S, A>(
  State(state): State<AppState<S, A>>,
  Payload(body): Payload<SubmitBody>,
) -> Result<Json<Submitted>, Error>
where
  S: IdentityStore + 'static,
  A: OAuthAdapter + 'static,
{
  let message = state.intake.submit(&body.email, &body.message).await?;
  Ok(Json(Submitted { message_id: message.message_id, created_at: message.created_at }))
}

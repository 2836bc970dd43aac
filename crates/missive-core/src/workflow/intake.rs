//! Message intake for confirmed subscribers.

use std::sync::Arc;

use crate::{
  Error, Result,
  store::IdentityStore,
  subscriber::{Message, normalize_email},
};

pub struct MessageIntake<S> {
  store: Arc<S>,
}

impl<S: IdentityStore> MessageIntake<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Persist `body` for the confirmed subscriber with `raw_email`.
  ///
  /// Unknown and unconfirmed addresses fail with the same
  /// [`Error::UnknownOrUnverifiedSubscriber`] so callers cannot probe which
  /// addresses exist.
  pub async fn submit(&self, raw_email: &str, body: &str) -> Result<Message> {
    let content = body.trim();
    if raw_email.trim().is_empty() || content.is_empty() {
      return Err(Error::InvalidInput("email and message are required".into()));
    }
    let email = normalize_email(raw_email)?;

    let subscriber = self
      .store
      .find_subscriber_by_email(&email)
      .await
      .map_err(Error::storage)?
      .filter(|s| s.confirmed)
      .ok_or(Error::UnknownOrUnverifiedSubscriber)?;

    let message = self
      .store
      .create_message(subscriber.subscriber_id, content.to_owned())
      .await
      .map_err(Error::storage)?;

    tracing::info!(
      message_id = %message.message_id,
      subscriber_id = %subscriber.subscriber_id,
      "message received"
    );
    Ok(message)
  }
}

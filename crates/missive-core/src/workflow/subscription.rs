//! Double opt-in subscription: start → issue token → dispatch mail → verify.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
  Error, Result,
  mail::{OutgoingMail, Outbox},
  store::{Conflict, IdentityStore, Insertion},
  subscriber::{NewSubscriber, Subscriber, normalize_email},
  token::{OsRngTokens, TokenSource},
};

/// How many fresh tokens are tried before giving up with
/// [`Error::TokenCollision`].
pub const TOKEN_ATTEMPTS: usize = 3;

pub struct Subscriptions<S> {
  store:     Arc<S>,
  tokens:    Box<dyn TokenSource>,
  outbox:    Outbox,
  base_url:  String,
  token_ttl: Option<TimeDelta>,
}

impl<S: IdentityStore> Subscriptions<S> {
  /// Verification links are built as `{base_url}/verify?token=...`.
  pub fn new(store: Arc<S>, outbox: Outbox, base_url: impl Into<String>) -> Self {
    Self {
      store,
      tokens: Box::new(OsRngTokens),
      outbox,
      base_url: base_url.into(),
      token_ttl: None,
    }
  }

  pub fn with_token_source(mut self, tokens: impl TokenSource + 'static) -> Self {
    self.tokens = Box::new(tokens);
    self
  }

  /// Tokens expire `ttl` after issue. `None` (the default) means tokens stay
  /// valid until redeemed.
  pub fn with_token_ttl(mut self, ttl: Option<TimeDelta>) -> Self {
    self.token_ttl = ttl;
    self
  }

  pub fn verification_link(&self, token: &str) -> String {
    format!("{}/verify?token={token}", self.base_url.trim_end_matches('/'))
  }

  // ── Start ─────────────────────────────────────────────────────────────

  /// Register `raw_email` as an unconfirmed subscriber and queue the
  /// verification mail.
  ///
  /// A second attempt for an address that already exists fails with
  /// [`Error::AlreadySubscribed`], whether or not it was confirmed. Mail
  /// delivery happens in the background; its failure never undoes the
  /// subscription.
  pub async fn start(&self, raw_email: &str) -> Result<Subscriber> {
    let email = normalize_email(raw_email)?;

    let existing = self
      .store
      .find_subscriber_by_email(&email)
      .await
      .map_err(Error::storage)?;
    if existing.is_some() {
      return Err(Error::AlreadySubscribed);
    }

    let subscriber = self.insert_pending(email).await?;
    tracing::info!(
      subscriber_id = %subscriber.subscriber_id,
      email = %subscriber.email,
      "subscriber created, pending verification"
    );
    self.dispatch(&subscriber);
    Ok(subscriber)
  }

  async fn insert_pending(&self, email: String) -> Result<Subscriber> {
    for attempt in 1..=TOKEN_ATTEMPTS {
      let input = NewSubscriber {
        email:            email.clone(),
        token:            self.tokens.generate(),
        token_expires_at: self.expiry(),
      };
      match self.store.create_subscriber(input).await.map_err(Error::storage)? {
        Insertion::Inserted(subscriber) => return Ok(subscriber),
        // Lost the race against a concurrent start for the same address.
        Insertion::Conflict(Conflict::Email) => return Err(Error::AlreadySubscribed),
        Insertion::Conflict(other) => {
          tracing::warn!(attempt, conflict = ?other, "verification token collision");
        }
      }
    }
    Err(Error::TokenCollision)
  }

  // ── Verify ────────────────────────────────────────────────────────────

  /// Redeem `token`, confirming its subscriber.
  ///
  /// A token can be redeemed once; replaying it fails with
  /// [`Error::InvalidToken`] exactly like a token that was never issued.
  pub async fn verify(&self, token: &str) -> Result<Subscriber> {
    let token = token.trim();
    if token.is_empty() {
      return Err(Error::MissingToken);
    }

    let subscriber = self
      .store
      .confirm_by_token(token, Utc::now())
      .await
      .map_err(Error::storage)?
      .ok_or(Error::InvalidToken)?;

    tracing::info!(
      subscriber_id = %subscriber.subscriber_id,
      email = %subscriber.email,
      "subscriber confirmed"
    );
    Ok(subscriber)
  }

  // ── Resend ────────────────────────────────────────────────────────────

  /// Issue a fresh token to an unconfirmed subscriber and queue a new mail.
  /// The previous token stops working.
  ///
  /// Unknown and already-confirmed addresses succeed without effect.
  pub async fn resend(&self, raw_email: &str) -> Result<()> {
    let email = normalize_email(raw_email)?;

    for attempt in 1..=TOKEN_ATTEMPTS {
      let reissued = self
        .store
        .reissue_token(&email, self.tokens.generate(), self.expiry())
        .await
        .map_err(Error::storage)?;
      match reissued {
        None => {
          tracing::debug!("resend requested for an address with nothing pending");
          return Ok(());
        }
        Some(Insertion::Inserted(subscriber)) => {
          tracing::info!(subscriber_id = %subscriber.subscriber_id, "verification token reissued");
          self.dispatch(&subscriber);
          return Ok(());
        }
        Some(Insertion::Conflict(conflict)) => {
          tracing::warn!(attempt, ?conflict, "verification token collision");
        }
      }
    }
    Err(Error::TokenCollision)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn confirmed(&self) -> Result<Vec<Subscriber>> {
    self.store.list_confirmed_subscribers().await.map_err(Error::storage)
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  fn expiry(&self) -> Option<DateTime<Utc>> { self.token_ttl.map(|ttl| Utc::now() + ttl) }

  fn dispatch(&self, subscriber: &Subscriber) {
    let token = match subscriber.token.as_deref() {
      Some(token) if subscriber.is_pending() => token,
      _ => return,
    };
    let mail = OutgoingMail::verification(&subscriber.email, &self.verification_link(token));
    if !self.outbox.enqueue(mail) {
      tracing::warn!(
        subscriber_id = %subscriber.subscriber_id,
        "verification mail not queued; a resend is required"
      );
    }
  }
}

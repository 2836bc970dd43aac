//! The `IdentityStore` trait and its write outcomes.
//!
//! The trait is implemented by storage backends (e.g. `missive-store-sqlite`).
//! The workflows in [`crate::workflow`] depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  social::{NewSocialUser, SocialUser},
  subscriber::{Message, NewSubscriber, Subscriber},
};

// ─── Write outcomes ──────────────────────────────────────────────────────────

/// Which uniqueness constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
  /// Another subscriber already holds this email address.
  Email,
  /// Another subscriber already holds this verification token.
  Token,
  /// A social user with this `(provider, provider_subject)` already exists.
  SocialIdentity,
}

/// Result of a write guarded by a uniqueness constraint.
///
/// Constraint violations are expected under concurrency, so they are reported
/// as a value rather than as a backend error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion<T> {
  Inserted(T),
  Conflict(Conflict),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the persistence of subscribers, messages and social users.
///
/// Implementations must enforce the following at the storage layer, not with
/// a read followed by a write:
///
/// - subscriber emails are unique;
/// - outstanding verification tokens are unique;
/// - `(provider, provider_subject)` is unique among social users;
/// - [`confirm_by_token`](Self::confirm_by_token) matches and mutates in one
///   atomic operation.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait IdentityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Subscribers ───────────────────────────────────────────────────────

  /// Exact match on the normalised address.
  fn find_subscriber_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Subscriber>, Self::Error>> + Send + 'a;

  /// Exact match on an outstanding token.
  fn find_subscriber_by_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<Subscriber>, Self::Error>> + Send + 'a;

  /// Persist a new unconfirmed subscriber holding `input.token`.
  ///
  /// Reports [`Conflict::Email`] or [`Conflict::Token`] when the respective
  /// unique constraint rejects the row.
  fn create_subscriber(
    &self,
    input: NewSubscriber,
  ) -> impl Future<Output = Result<Insertion<Subscriber>, Self::Error>> + Send + '_;

  /// Atomically confirm the subscriber holding `token` and clear the token.
  ///
  /// Tokens whose `token_expires_at` is at or before `now` do not match.
  /// Returns the confirmed subscriber, or `None` if nothing matched. Of any
  /// number of concurrent calls with the same token, at most one returns
  /// `Some`.
  fn confirm_by_token<'a>(
    &'a self,
    token: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Subscriber>, Self::Error>> + Send + 'a;

  /// Replace the token of the *unconfirmed* subscriber with `email`.
  ///
  /// Returns `None` when no unconfirmed subscriber has that address, and
  /// `Some(Insertion::Conflict(Conflict::Token))` when the new token is taken.
  fn reissue_token<'a>(
    &'a self,
    email: &'a str,
    token: String,
    expires_at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Option<Insertion<Subscriber>>, Self::Error>>
  + Send
  + 'a;

  /// All confirmed subscribers, oldest first.
  fn list_confirmed_subscribers(
    &self,
  ) -> impl Future<Output = Result<Vec<Subscriber>, Self::Error>> + Send + '_;

  // ── Messages ──────────────────────────────────────────────────────────

  /// Persist a message. The `created_at` timestamp is set by the store.
  fn create_message(
    &self,
    subscriber_id: Uuid,
    content: String,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  // ── Social users ──────────────────────────────────────────────────────

  fn find_social_user<'a>(
    &'a self,
    provider: &'a str,
    provider_subject: &'a str,
  ) -> impl Future<Output = Result<Option<SocialUser>, Self::Error>> + Send + 'a;

  /// Persist a new social user, reporting [`Conflict::SocialIdentity`] when
  /// the `(provider, provider_subject)` pair is already taken.
  fn create_social_user(
    &self,
    input: NewSocialUser,
  ) -> impl Future<Output = Result<Insertion<SocialUser>, Self::Error>> + Send + '_;
}

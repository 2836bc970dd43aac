//! Error taxonomy for the Missive workflows.

use thiserror::Error;

use crate::oauth::AuthError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("this email address is already subscribed")]
  AlreadySubscribed,

  #[error("verification token is missing")]
  MissingToken,

  #[error("verification token is invalid or has already been used")]
  InvalidToken,

  #[error("could not issue a unique verification token")]
  TokenCollision,

  #[error("unknown or unverified subscriber")]
  UnknownOrUnverifiedSubscriber,

  #[error("auth provider error: {0}")]
  AuthProvider(#[from] AuthError),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error from an [`IdentityStore`](crate::store::IdentityStore).
  pub fn storage<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(err))
  }

  /// Whether the caller can fix the request and try again.
  pub fn is_user_error(&self) -> bool {
    matches!(
      self,
      Self::InvalidInput(_)
        | Self::AlreadySubscribed
        | Self::MissingToken
        | Self::InvalidToken
        | Self::UnknownOrUnverifiedSubscriber
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

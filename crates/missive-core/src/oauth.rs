//! Contract for the external OAuth 2 identity providers.
//!
//! The adapter owns the whole handshake: authorize URL construction, CSRF
//! `state` verification, code exchange and profile normalisation. The
//! workflow in [`crate::workflow::social`] only ever sees a
//! [`NormalizedProfile`].

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider profile reduced to the fields Missive keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedProfile {
  /// Provider-assigned subject identifier; never empty.
  pub subject_id: String,
  pub name:       Option<String>,
  pub email:      Option<String>,
  pub avatar_url: Option<String>,
}

/// Where to send the browser to start a login, plus the CSRF `state` that
/// must come back on the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
  pub url:   String,
  pub state: String,
}

/// Query parameters a provider appends to the callback URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
  pub code:  Option<String>,
  pub state: Option<String>,
  /// Set by the provider when the user denied consent.
  pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
  #[error("unknown or unconfigured provider: {0}")]
  UnknownProvider(String),

  #[error("oauth state does not match the login that was started")]
  StateMismatch,

  #[error("provider denied the login: {0}")]
  Denied(String),

  #[error("callback is missing the authorization code")]
  MissingCode,

  #[error("provider request failed: {0}")]
  Provider(String),

  #[error("provider returned an unusable profile: {0}")]
  Profile(String),
}

/// A set of OAuth providers addressed by name (`"github"`, `"google"`, ...).
pub trait OAuthAdapter: Send + Sync {
  /// Build the provider authorize URL and a fresh CSRF state.
  fn begin_login(&self, provider: &str) -> Result<LoginRedirect, AuthError>;

  /// Finish the handshake started by [`begin_login`](Self::begin_login).
  ///
  /// `expected_state` is the state the browser carried back (from its
  /// cookie). Implementations must reject a missing or mismatching state
  /// before making any network call.
  fn complete_login<'a>(
    &'a self,
    provider: &'a str,
    params: &'a CallbackParams,
    expected_state: Option<&'a str>,
  ) -> impl Future<Output = Result<NormalizedProfile, AuthError>> + Send + 'a;
}

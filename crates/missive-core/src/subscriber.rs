//! Subscribers and the messages they submit.
//!
//! A subscriber is created unconfirmed with a pending verification token and
//! becomes confirmed exactly once, at which point the token is cleared.
//! Subscribers are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Subscriber ──────────────────────────────────────────────────────────────

/// An email identity in the double opt-in funnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
  pub subscriber_id:    Uuid,
  /// Normalised address; unique across all subscribers.
  pub email:            String,
  pub confirmed:        bool,
  /// Outstanding verification token. Always `None` once confirmed.
  #[serde(skip_serializing)]
  pub token:            Option<String>,
  pub token_expires_at: Option<DateTime<Utc>>,
  pub created_at:       DateTime<Utc>,
  pub confirmed_at:     Option<DateTime<Utc>>,
}

impl Subscriber {
  /// Unconfirmed with a token that can still be redeemed.
  pub fn is_pending(&self) -> bool { !self.confirmed && self.token.is_some() }
}

/// Input for [`IdentityStore::create_subscriber`](crate::store::IdentityStore::create_subscriber).
/// The subscriber id and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
  pub email:            String,
  pub token:            String,
  pub token_expires_at: Option<DateTime<Utc>>,
}

// ─── Message ─────────────────────────────────────────────────────────────────

/// Free text submitted by a confirmed subscriber. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub message_id:    Uuid,
  pub subscriber_id: Uuid,
  pub content:       String,
  pub created_at:    DateTime<Utc>,
}

// ─── Email normalisation ─────────────────────────────────────────────────────

/// Trim and lowercase a raw address and apply a minimal syntax check.
///
/// Addresses are compared case-insensitively, so `A@X.com` and `a@x.com`
/// are the same subscriber.
pub fn normalize_email(raw: &str) -> Result<String> {
  let email = raw.trim();
  if email.is_empty() {
    return Err(Error::InvalidInput("email is required".into()));
  }
  if email.chars().any(char::is_whitespace) {
    return Err(Error::InvalidInput("email must not contain whitespace".into()));
  }
  match email.rsplit_once('@') {
    Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
      Ok(email.to_lowercase())
    }
    _ => Err(Error::InvalidInput(format!("{email:?} is not an email address"))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalizes_case_and_whitespace() {
    assert_eq!(normalize_email("  Alice@Example.COM \n").unwrap(), "alice@example.com");
  }

  #[test]
  fn rejects_empty_and_blank() {
    assert!(matches!(normalize_email(""), Err(Error::InvalidInput(_))));
    assert!(matches!(normalize_email("   "), Err(Error::InvalidInput(_))));
  }

  #[test]
  fn rejects_missing_at_or_parts() {
    for raw in ["alice", "@example.com", "alice@", "@"] {
      assert!(
        matches!(normalize_email(raw), Err(Error::InvalidInput(_))),
        "{raw:?} should be rejected"
      );
    }
  }

  #[test]
  fn rejects_inner_whitespace() {
    assert!(matches!(
      normalize_email("al ice@example.com"),
      Err(Error::InvalidInput(_))
    ));
  }

  #[test]
  fn pending_requires_token_and_unconfirmed() {
    let mut s = Subscriber {
      subscriber_id:    Uuid::new_v4(),
      email:            "a@x.com".into(),
      confirmed:        false,
      token:            Some("t".into()),
      token_expires_at: None,
      created_at:       Utc::now(),
      confirmed_at:     None,
    };
    assert!(s.is_pending());
    s.confirmed = true;
    s.token = None;
    assert!(!s.is_pending());
  }
}

//! Identities resolved through third-party OAuth providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::oauth::NormalizedProfile;

/// A social-login identity, unique per `(provider, provider_subject)`.
///
/// The same person signing in through two providers yields two records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialUser {
  pub social_user_id:   Uuid,
  pub provider:         String,
  /// Provider-assigned subject identifier.
  pub provider_subject: String,
  pub name:             Option<String>,
  pub email:            Option<String>,
  pub avatar_url:       Option<String>,
  pub created_at:       DateTime<Utc>,
}

/// Input for [`IdentityStore::create_social_user`](crate::store::IdentityStore::create_social_user).
#[derive(Debug, Clone)]
pub struct NewSocialUser {
  pub provider:         String,
  pub provider_subject: String,
  pub name:             Option<String>,
  pub email:            Option<String>,
  pub avatar_url:       Option<String>,
}

impl NewSocialUser {
  pub fn from_profile(provider: &str, profile: NormalizedProfile) -> Self {
    Self {
      provider:         provider.to_owned(),
      provider_subject: profile.subject_id,
      name:             profile.name,
      email:            profile.email,
      avatar_url:       profile.avatar_url,
    }
  }
}

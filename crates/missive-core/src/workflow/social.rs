//! Social-login reconciliation: map a provider profile to a local identity.

use std::sync::Arc;

use serde::Serialize;

use crate::{
  Error, Result,
  oauth::{AuthError, CallbackParams, LoginRedirect, NormalizedProfile, OAuthAdapter},
  social::{NewSocialUser, SocialUser},
  store::{IdentityStore, Insertion},
};

/// The identity a login resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
  pub user:    SocialUser,
  /// `true` when this login created the record.
  pub created: bool,
}

pub struct SocialLogin<S, A> {
  store:   Arc<S>,
  adapter: Arc<A>,
}

impl<S, A> SocialLogin<S, A>
where
  S: IdentityStore,
  A: OAuthAdapter,
{
  pub fn new(store: Arc<S>, adapter: Arc<A>) -> Self { Self { store, adapter } }

  pub fn begin(&self, provider: &str) -> Result<LoginRedirect> {
    Ok(self.adapter.begin_login(provider)?)
  }

  /// Finish the provider handshake and reconcile the returned profile.
  ///
  /// Adapter failures surface as [`Error::AuthProvider`] and leave the store
  /// untouched.
  pub async fn complete(
    &self,
    provider: &str,
    params: &CallbackParams,
    expected_state: Option<&str>,
  ) -> Result<Resolved> {
    let profile = self
      .adapter
      .complete_login(provider, params, expected_state)
      .await?;
    self.reconcile(provider, profile).await
  }

  /// Return the social user for `(provider, profile.subject_id)`, creating it
  /// on first sight.
  ///
  /// An existing record is returned as stored; name, email and avatar are
  /// not refreshed. Concurrent first logins for the same identity all resolve
  /// to the one row that won the insert.
  pub async fn reconcile(&self, provider: &str, profile: NormalizedProfile) -> Result<Resolved> {
    if profile.subject_id.trim().is_empty() {
      return Err(AuthError::Profile("missing subject id".into()).into());
    }

    if let Some(user) = self.find(provider, &profile.subject_id).await? {
      tracing::info!(social_user_id = %user.social_user_id, provider, "social login");
      return Ok(Resolved { user, created: false });
    }

    let input = NewSocialUser::from_profile(provider, profile);
    let subject = input.provider_subject.clone();
    match self.store.create_social_user(input).await.map_err(Error::storage)? {
      Insertion::Inserted(user) => {
        tracing::info!(social_user_id = %user.social_user_id, provider, "social user created");
        Ok(Resolved { user, created: true })
      }
      Insertion::Conflict(_) => {
        let user = self.find(provider, &subject).await?.ok_or_else(|| {
          Error::Storage(format!("{provider} identity {subject} conflicted but is missing").into())
        })?;
        Ok(Resolved { user, created: false })
      }
    }
  }

  async fn find(&self, provider: &str, subject: &str) -> Result<Option<SocialUser>> {
    self.store.find_social_user(provider, subject).await.map_err(Error::storage)
  }
}

//! reqwest-backed [`OAuthAdapter`] over the configured providers.
//!
//! The CSRF `state` is a random token the handler stores in a cookie; on the
//! callback it is compared in constant time with the one the provider echoes
//! back, before the authorization code is ever exchanged.

pub mod provider;

pub use provider::ProviderKind;

use std::{collections::HashMap, time::Duration};

use missive_core::{
  oauth::{AuthError, CallbackParams, LoginRedirect, NormalizedProfile, OAuthAdapter},
  token::random_token,
};
use reqwest::{Client, Url, header::ACCEPT};
use serde::Deserialize;
use subtle::ConstantTimeEq as _;

use crate::config::ProviderCredentials;

struct Provider {
  kind:        ProviderKind,
  credentials: ProviderCredentials,
}

/// The providers with credentials in the configuration.
pub struct ProviderSet {
  client:    Client,
  base_url:  String,
  providers: HashMap<&'static str, Provider>,
}

#[derive(Deserialize)]
struct TokenResponse {
  access_token:      Option<String>,
  error:             Option<String>,
  error_description: Option<String>,
}

fn provider_error(e: reqwest::Error) -> AuthError { AuthError::Provider(e.to_string()) }

impl ProviderSet {
  /// Build the set from the configured credentials. Names that do not match a
  /// known provider are logged and skipped.
  pub fn new(
    base_url: &str,
    credentials: &HashMap<String, ProviderCredentials>,
    timeout: Duration,
  ) -> Result<Self, reqwest::Error> {
    let client = Client::builder()
      .timeout(timeout)
      .user_agent(concat!("missive/", env!("CARGO_PKG_VERSION")))
      .build()?;

    let mut providers = HashMap::new();
    for (name, creds) in credentials {
      match ProviderKind::from_name(&name.to_ascii_lowercase()) {
        Some(kind) => {
          providers.insert(kind.name(), Provider { kind, credentials: creds.clone() });
        }
        None => tracing::warn!(provider = %name, "ignoring unknown oauth provider"),
      }
    }

    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned(), providers })
  }

  /// Names of the enabled providers, sorted.
  pub fn enabled(&self) -> Vec<&'static str> {
    let mut names: Vec<_> = self.providers.keys().copied().collect();
    names.sort_unstable();
    names
  }

  fn get(&self, name: &str) -> Result<&Provider, AuthError> {
    self
      .providers
      .get(name)
      .ok_or_else(|| AuthError::UnknownProvider(name.to_owned()))
  }

  fn callback_url(&self, kind: ProviderKind) -> String {
    format!("{}/auth/{}/callback", self.base_url, kind.name())
  }

  async fn exchange_code(&self, provider: &Provider, code: &str) -> Result<String, AuthError> {
    let redirect_uri = self.callback_url(provider.kind);
    let response: TokenResponse = self
      .client
      .post(provider.kind.token_url())
      .header(ACCEPT, "application/json")
      .form(&[
        ("client_id", provider.credentials.client_id.as_str()),
        ("client_secret", provider.credentials.client_secret.as_str()),
        ("code", code),
        ("redirect_uri", redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
      ])
      .send()
      .await
      .map_err(provider_error)?
      .error_for_status()
      .map_err(provider_error)?
      .json()
      .await
      .map_err(provider_error)?;

    // GitHub reports exchange failures with a 200 and an `error` field.
    match response {
      TokenResponse { access_token: Some(token), .. } if !token.is_empty() => Ok(token),
      TokenResponse { error, error_description, .. } => Err(AuthError::Provider(format!(
        "token exchange failed: {}",
        error_description.or(error).unwrap_or_else(|| "no access token".to_owned())
      ))),
    }
  }

  async fn fetch_profile(
    &self,
    provider: &Provider,
    access_token: &str,
  ) -> Result<NormalizedProfile, AuthError> {
    let doc: serde_json::Value = self
      .client
      .get(provider.kind.userinfo_url())
      .bearer_auth(access_token)
      .header(ACCEPT, "application/json")
      .send()
      .await
      .map_err(provider_error)?
      .error_for_status()
      .map_err(provider_error)?
      .json()
      .await
      .map_err(provider_error)?;

    provider.kind.normalize(&doc)
  }
}

/// Both states must be present and equal.
fn verify_state(returned: Option<&str>, expected: Option<&str>) -> Result<(), AuthError> {
  match (returned, expected) {
    (Some(returned), Some(expected))
      if !expected.is_empty() && bool::from(returned.as_bytes().ct_eq(expected.as_bytes())) =>
    {
      Ok(())
    }
    _ => Err(AuthError::StateMismatch),
  }
}

impl OAuthAdapter for ProviderSet {
  fn begin_login(&self, provider: &str) -> Result<LoginRedirect, AuthError> {
    let p = self.get(provider)?;
    let state = random_token();
    let redirect_uri = self.callback_url(p.kind);

    let url = Url::parse_with_params(p.kind.authorize_url(), &[
      ("client_id", p.credentials.client_id.as_str()),
      ("redirect_uri", redirect_uri.as_str()),
      ("response_type", "code"),
      ("scope", p.kind.scope()),
      ("state", state.as_str()),
    ])
    .map_err(|e| AuthError::Provider(format!("bad authorize url: {e}")))?;

    Ok(LoginRedirect { url: url.into(), state })
  }

  async fn complete_login(
    &self,
    provider: &str,
    params: &CallbackParams,
    expected_state: Option<&str>,
  ) -> Result<NormalizedProfile, AuthError> {
    let p = self.get(provider)?;
    verify_state(params.state.as_deref(), expected_state)?;

    if let Some(reason) = &params.error {
      return Err(AuthError::Denied(reason.clone()));
    }
    let code = params
      .code
      .as_deref()
      .filter(|c| !c.is_empty())
      .ok_or(AuthError::MissingCode)?;

    let token = self.exchange_code(p, code).await?;
    self.fetch_profile(p, &token).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn set() -> ProviderSet {
    let mut creds = HashMap::new();
    creds.insert(
      "GitHub".to_owned(),
      ProviderCredentials { client_id: "gh-id".into(), client_secret: "gh-secret".into() },
    );
    creds.insert(
      "myspace".to_owned(),
      ProviderCredentials { client_id: "x".into(), client_secret: "y".into() },
    );
    ProviderSet::new("https://news.example/", &creds, Duration::from_secs(1)).unwrap()
  }

  fn params(state: Option<&str>, code: Option<&str>, error: Option<&str>) -> CallbackParams {
    CallbackParams {
      code:  code.map(Into::into),
      state: state.map(Into::into),
      error: error.map(Into::into),
    }
  }

  #[test]
  fn only_known_providers_are_enabled() {
    assert_eq!(set().enabled(), ["github"]);
  }

  #[test]
  fn begin_builds_authorize_url() {
    let redirect = set().begin_login("github").unwrap();
    let url = Url::parse(&redirect.url).unwrap();
    assert_eq!(url.host_str(), Some("github.com"));

    let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(query["client_id"], "gh-id");
    assert_eq!(query["redirect_uri"], "https://news.example/auth/github/callback");
    assert_eq!(query["response_type"], "code");
    assert_eq!(query["state"], redirect.state);
    assert_eq!(redirect.state.len(), 32);
  }

  #[test]
  fn begin_unknown_provider() {
    assert!(matches!(
      set().begin_login("google"),
      Err(AuthError::UnknownProvider(p)) if p == "google"
    ));
  }

  #[tokio::test]
  async fn mismatched_or_missing_state_is_rejected() {
    let s = set();
    let cases = [
      (params(Some("abc"), Some("code"), None), Some("abd")),
      (params(None, Some("code"), None), Some("abc")),
      (params(Some("abc"), Some("code"), None), None),
      (params(Some(""), Some("code"), None), Some("")),
    ];
    for (p, expected) in cases {
      assert!(matches!(
        s.complete_login("github", &p, expected).await,
        Err(AuthError::StateMismatch)
      ));
    }
  }

  #[tokio::test]
  async fn denied_and_missing_code_fail_before_exchange() {
    let s = set();
    let denied = params(Some("st"), None, Some("access_denied"));
    assert!(matches!(
      s.complete_login("github", &denied, Some("st")).await,
      Err(AuthError::Denied(r)) if r == "access_denied"
    ));

    let no_code = params(Some("st"), None, None);
    assert!(matches!(
      s.complete_login("github", &no_code, Some("st")).await,
      Err(AuthError::MissingCode)
    ));
  }

  #[tokio::test]
  async fn complete_unknown_provider() {
    let p = params(Some("st"), Some("code"), None);
    assert!(matches!(
      set().complete_login("facebook", &p, Some("st")).await,
      Err(AuthError::UnknownProvider(_))
    ));
  }
}

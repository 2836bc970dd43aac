//! Per-provider endpoints and profile normalisation.

use missive_core::oauth::{AuthError, NormalizedProfile};
use serde_json::Value;

/// The OAuth 2 providers Missive knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
  Github,
  Google,
  Facebook,
}

impl ProviderKind {
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "github" => Some(Self::Github),
      "google" => Some(Self::Google),
      "facebook" => Some(Self::Facebook),
      _ => None,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::Github => "github",
      Self::Google => "google",
      Self::Facebook => "facebook",
    }
  }

  pub fn authorize_url(self) -> &'static str {
    match self {
      Self::Github => "https://github.com/login/oauth/authorize",
      Self::Google => "https://accounts.google.com/o/oauth2/v2/auth",
      Self::Facebook => "https://www.facebook.com/v19.0/dialog/oauth",
    }
  }

  pub fn token_url(self) -> &'static str {
    match self {
      Self::Github => "https://github.com/login/oauth/access_token",
      Self::Google => "https://oauth2.googleapis.com/token",
      Self::Facebook => "https://graph.facebook.com/v19.0/oauth/access_token",
    }
  }

  pub fn userinfo_url(self) -> &'static str {
    match self {
      Self::Github => "https://api.github.com/user",
      Self::Google => "https://openidconnect.googleapis.com/v1/userinfo",
      Self::Facebook => "https://graph.facebook.com/me?fields=id,name,email,picture",
    }
  }

  pub fn scope(self) -> &'static str {
    match self {
      Self::Github => "read:user user:email",
      Self::Google => "openid email profile",
      Self::Facebook => "email public_profile",
    }
  }

  /// Reduce a provider's userinfo document to a [`NormalizedProfile`].
  pub fn normalize(self, doc: &Value) -> Result<NormalizedProfile, AuthError> {
    let text = |key: &str| {
      doc
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
    };

    let (subject, name, avatar_url) = match self {
      Self::Github => (
        identifier(doc.get("id")),
        text("name").or_else(|| text("login")),
        text("avatar_url"),
      ),
      Self::Google => (identifier(doc.get("sub")), text("name"), text("picture")),
      Self::Facebook => (
        identifier(doc.get("id")),
        text("name"),
        doc
          .pointer("/picture/data/url")
          .and_then(Value::as_str)
          .map(str::to_owned),
      ),
    };

    let subject_id = subject.ok_or_else(|| {
      AuthError::Profile(format!("{} profile has no subject id", self.name()))
    })?;

    Ok(NormalizedProfile { subject_id, name, email: text("email"), avatar_url })
  }
}

/// Subject ids arrive as strings from some providers and numbers from others.
fn identifier(value: Option<&Value>) -> Option<String> {
  match value? {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn github_uses_numeric_id_and_falls_back_to_login() {
    let doc = json!({
      "id": 583231,
      "login": "octocat",
      "name": null,
      "email": "octocat@github.com",
      "avatar_url": "https://avatars.githubusercontent.com/u/583231"
    });
    let p = ProviderKind::Github.normalize(&doc).unwrap();
    assert_eq!(p.subject_id, "583231");
    assert_eq!(p.name.as_deref(), Some("octocat"));
    assert_eq!(p.email.as_deref(), Some("octocat@github.com"));
    assert!(p.avatar_url.is_some());
  }

  #[test]
  fn google_uses_sub_and_picture() {
    let doc = json!({
      "sub": "1099",
      "name": "Ada",
      "email": "ada@example.com",
      "picture": "https://lh3.example/ada.png"
    });
    let p = ProviderKind::Google.normalize(&doc).unwrap();
    assert_eq!(p.subject_id, "1099");
    assert_eq!(p.avatar_url.as_deref(), Some("https://lh3.example/ada.png"));
  }

  #[test]
  fn facebook_reads_nested_picture() {
    let doc = json!({
      "id": "10158",
      "name": "Grace",
      "picture": { "data": { "url": "https://fb.example/g.jpg" } }
    });
    let p = ProviderKind::Facebook.normalize(&doc).unwrap();
    assert_eq!(p.subject_id, "10158");
    assert_eq!(p.email, None);
    assert_eq!(p.avatar_url.as_deref(), Some("https://fb.example/g.jpg"));
  }

  #[test]
  fn missing_subject_is_a_profile_error() {
    let doc = json!({ "name": "nobody", "id": "" });
    assert!(matches!(
      ProviderKind::Facebook.normalize(&doc),
      Err(AuthError::Profile(_))
    ));
  }

  #[test]
  fn names_round_trip() {
    for kind in [ProviderKind::Github, ProviderKind::Google, ProviderKind::Facebook] {
      assert_eq!(ProviderKind::from_name(kind.name()), Some(kind));
    }
    assert_eq!(ProviderKind::from_name("myspace"), None);
  }
}

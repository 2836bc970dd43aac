//! Runtime server configuration.
//!
//! Read from an optional TOML file layered under `MISSIVE_*` environment
//! variables. Nested keys use a double underscore, e.g.
//! `MISSIVE_SMTP__HOST` or `MISSIVE_PROVIDERS__GITHUB__CLIENT_ID`.

use std::{collections::HashMap, path::{Path, PathBuf}, time::Duration};

use chrono::TimeDelta;
use serde::Deserialize;

use crate::auth::AuthConfig;

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  /// Public origin used in verification links and OAuth redirect URIs.
  pub base_url:              String,
  #[serde(default = "default_store_path")]
  pub store_path:            PathBuf,
  /// Verification tokens expire this many seconds after issue. Unset means
  /// tokens never expire.
  #[serde(default)]
  pub token_ttl_secs:        Option<u64>,
  #[serde(default = "default_outbox_capacity")]
  pub outbox_capacity:       usize,
  #[serde(default = "default_timeout_secs")]
  pub mail_timeout_secs:     u64,
  #[serde(default = "default_timeout_secs")]
  pub provider_timeout_secs: u64,
  /// Without SMTP settings, mail is written to the log instead.
  #[serde(default)]
  pub smtp:                  Option<SmtpSettings>,
  /// OAuth client credentials keyed by provider name.
  #[serde(default)]
  pub providers:             HashMap<String, ProviderCredentials>,
  #[serde(default)]
  pub admin_username:        Option<String>,
  /// Argon2 PHC string; see `missive --hash-password`.
  #[serde(default)]
  pub admin_password_hash:   Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpSettings {
  pub host:       String,
  /// 465 uses implicit TLS; any other port upgrades with STARTTLS.
  #[serde(default = "default_smtp_port")]
  pub port:       u16,
  pub username:   String,
  pub password:   String,
  pub from_email: String,
  #[serde(default)]
  pub from_name:  Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderCredentials {
  pub client_id:     String,
  pub client_secret: String,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("missive.db") }
fn default_outbox_capacity() -> usize { 256 }
fn default_timeout_secs() -> u64 { 10 }
fn default_smtp_port() -> u16 { 465 }

impl ServerConfig {
  /// Layer `path` (optional) under the `MISSIVE_*` environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("MISSIVE")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn token_ttl(&self) -> Option<TimeDelta> {
    self
      .token_ttl_secs
      .and_then(|secs| TimeDelta::try_seconds(i64::try_from(secs).ok()?))
  }

  pub fn mail_timeout(&self) -> Duration { Duration::from_secs(self.mail_timeout_secs) }

  pub fn provider_timeout(&self) -> Duration { Duration::from_secs(self.provider_timeout_secs) }

  /// Cookies get the `Secure` attribute when served over https.
  pub fn secure_cookies(&self) -> bool { self.base_url.starts_with("https://") }

  /// Admin credentials, if both the username and the hash are configured.
  pub fn admin(&self) -> Option<AuthConfig> {
    match (&self.admin_username, &self.admin_password_hash) {
      (Some(username), Some(hash)) if !username.is_empty() && !hash.is_empty() => {
        Some(AuthConfig { username: username.clone(), password_hash: hash.clone() })
      }
      _ => None,
    }
  }
}

//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision and a `Z` suffix, so lexical order in SQL matches time order.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use missive_core::{
  social::SocialUser,
  subscriber::{Message, Subscriber},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Subscriber ───────────────────────────────────────────────────────────────

pub const SUBSCRIBER_COLUMNS: &str =
  "subscriber_id, email, confirmed, token, token_expires_at, created_at, confirmed_at";

/// A raw row from `subscribers` before domain decoding.
pub struct RawSubscriber {
  pub subscriber_id:    String,
  pub email:            String,
  pub confirmed:        bool,
  pub token:            Option<String>,
  pub token_expires_at: Option<String>,
  pub created_at:       String,
  pub confirmed_at:     Option<String>,
}

impl RawSubscriber {
  /// Column order follows [`SUBSCRIBER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subscriber_id:    row.get(0)?,
      email:            row.get(1)?,
      confirmed:        row.get(2)?,
      token:            row.get(3)?,
      token_expires_at: row.get(4)?,
      created_at:       row.get(5)?,
      confirmed_at:     row.get(6)?,
    })
  }

  pub fn into_subscriber(self) -> Result<Subscriber> {
    Ok(Subscriber {
      subscriber_id:    decode_uuid(&self.subscriber_id)?,
      email:            self.email,
      confirmed:        self.confirmed,
      token:            self.token,
      token_expires_at: decode_opt_dt(self.token_expires_at)?,
      created_at:       decode_dt(&self.created_at)?,
      confirmed_at:     decode_opt_dt(self.confirmed_at)?,
    })
  }
}

// ─── Message ──────────────────────────────────────────────────────────────────

pub struct RawMessage {
  pub message_id:    String,
  pub subscriber_id: String,
  pub content:       String,
  pub created_at:    String,
}

impl RawMessage {
  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id:    decode_uuid(&self.message_id)?,
      subscriber_id: decode_uuid(&self.subscriber_id)?,
      content:       self.content,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

// ─── SocialUser ───────────────────────────────────────────────────────────────

pub const SOCIAL_USER_COLUMNS: &str =
  "social_user_id, provider, provider_subject, name, email, avatar_url, created_at";

pub struct RawSocialUser {
  pub social_user_id:   String,
  pub provider:         String,
  pub provider_subject: String,
  pub name:             Option<String>,
  pub email:            Option<String>,
  pub avatar_url:       Option<String>,
  pub created_at:       String,
}

impl RawSocialUser {
  /// Column order follows [`SOCIAL_USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      social_user_id:   row.get(0)?,
      provider:         row.get(1)?,
      provider_subject: row.get(2)?,
      name:             row.get(3)?,
      email:            row.get(4)?,
      avatar_url:       row.get(5)?,
      created_at:       row.get(6)?,
    })
  }

  pub fn into_social_user(self) -> Result<SocialUser> {
    Ok(SocialUser {
      social_user_id:   decode_uuid(&self.social_user_id)?,
      provider:         self.provider,
      provider_subject: self.provider_subject,
      name:             self.name,
      email:            self.email,
      avatar_url:       self.avatar_url,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

// ─── Constraint errors ────────────────────────────────────────────────────────

/// `true` for a UNIQUE constraint failure (not PRIMARY KEY, CHECK, ...).
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let early = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
    let late = early + chrono::TimeDelta::milliseconds(1500);
    assert!(encode_dt(early) < encode_dt(late));
    assert!(encode_dt(early).ends_with('Z'));
  }

  #[test]
  fn timestamp_roundtrip_keeps_micros() {
    let dt = Utc.timestamp_micros(1_766_000_000_123_456).unwrap();
    assert_eq!(decode_dt(&encode_dt(dt)).unwrap(), dt);
  }

  #[test]
  fn bad_timestamp_is_a_parse_error() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}

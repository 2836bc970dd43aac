//! [`SqliteStore`] — the SQLite implementation of [`IdentityStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use missive_core::{
  social::{NewSocialUser, SocialUser},
  store::{Conflict, IdentityStore, Insertion},
  subscriber::{Message, NewSubscriber, Subscriber},
};

use crate::{
  Error, Result,
  encode::{
    RawMessage, RawSocialUser, RawSubscriber, SOCIAL_USER_COLUMNS, SUBSCRIBER_COLUMNS,
    encode_dt, encode_uuid, is_unique_violation,
  },
  schema::{SCHEMA, SCHEMA_VERSION},
};

/// Current time at the precision the store keeps.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Missive identity store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// statements are serialised on the connection's worker thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let version: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?))
      .await?;
    if version > SCHEMA_VERSION {
      return Err(Error::SchemaVersion(version));
    }

    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn subscriber_where(&self, column: &'static str, value: String) -> Result<Option<Subscriber>> {
    let raw: Option<RawSubscriber> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE {column} = ?1"),
              rusqlite::params![value],
              RawSubscriber::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubscriber::into_subscriber).transpose()
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = Error;

  // ── Subscribers ───────────────────────────────────────────────────────────

  async fn find_subscriber_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
    self.subscriber_where("email", email.to_owned()).await
  }

  async fn find_subscriber_by_token(&self, token: &str) -> Result<Option<Subscriber>> {
    self.subscriber_where("token", token.to_owned()).await
  }

  async fn create_subscriber(&self, input: NewSubscriber) -> Result<Insertion<Subscriber>> {
    let subscriber = Subscriber {
      subscriber_id:    Uuid::new_v4(),
      email:            input.email,
      confirmed:        false,
      token:            Some(input.token),
      token_expires_at: input.token_expires_at.map(|at| at.trunc_subsecs(6)),
      created_at:       now(),
      confirmed_at:     None,
    };

    let id_str      = encode_uuid(subscriber.subscriber_id);
    let email       = subscriber.email.clone();
    let token       = subscriber.token.clone();
    let expires_str = subscriber.token_expires_at.map(encode_dt);
    let at_str      = encode_dt(subscriber.created_at);

    let conflict: Option<Conflict> = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO subscribers (subscriber_id, email, confirmed, token, token_expires_at, created_at)
           VALUES (?1, ?2, 0, ?3, ?4, ?5)",
          rusqlite::params![id_str, email, token, expires_str, at_str],
        );
        match inserted {
          Ok(_) => Ok(None),
          Err(e) if is_unique_violation(&e) => {
            // Runs on the same connection thread as the failed insert, so
            // nothing can slip in between.
            let email_taken: bool = conn.query_row(
              "SELECT EXISTS (SELECT 1 FROM subscribers WHERE email = ?1)",
              rusqlite::params![email],
              |r| r.get(0),
            )?;
            Ok(Some(if email_taken { Conflict::Email } else { Conflict::Token }))
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(match conflict {
      None => Insertion::Inserted(subscriber),
      Some(c) => Insertion::Conflict(c),
    })
  }

  async fn confirm_by_token(
    &self,
    token: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<Subscriber>> {
    let token   = token.to_owned();
    let now_str = encode_dt(now);

    // Match and mutate in one statement: of concurrent callers with the same
    // token only the first sees a row.
    let raw: Option<RawSubscriber> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE subscribers
                    SET confirmed = 1, token = NULL, token_expires_at = NULL, confirmed_at = ?2
                  WHERE token = ?1
                    AND confirmed = 0
                    AND (token_expires_at IS NULL OR token_expires_at > ?2)
                 RETURNING {SUBSCRIBER_COLUMNS}"
              ),
              rusqlite::params![token, now_str],
              RawSubscriber::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubscriber::into_subscriber).transpose()
  }

  async fn reissue_token(
    &self,
    email: &str,
    token: String,
    expires_at: Option<DateTime<Utc>>,
  ) -> Result<Option<Insertion<Subscriber>>> {
    let email       = email.to_owned();
    let expires_str = expires_at.map(encode_dt);

    let outcome: Option<std::result::Result<RawSubscriber, Conflict>> = self
      .conn
      .call(move |conn| {
        let updated = conn
          .query_row(
            &format!(
              "UPDATE subscribers
                  SET token = ?2, token_expires_at = ?3
                WHERE email = ?1 AND confirmed = 0
               RETURNING {SUBSCRIBER_COLUMNS}"
            ),
            rusqlite::params![email, token, expires_str],
            RawSubscriber::from_row,
          )
          .optional();
        match updated {
          Ok(row) => Ok(row.map(Ok)),
          Err(e) if is_unique_violation(&e) => Ok(Some(Err(Conflict::Token))),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    outcome
      .map(|row| match row {
        Ok(raw) => raw.into_subscriber().map(Insertion::Inserted),
        Err(c) => Ok(Insertion::Conflict(c)),
      })
      .transpose()
  }

  async fn list_confirmed_subscribers(&self) -> Result<Vec<Subscriber>> {
    let raws: Vec<RawSubscriber> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers
            WHERE confirmed = 1
            ORDER BY created_at, subscriber_id"
        ))?;
        let rows = stmt
          .query_map([], RawSubscriber::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubscriber::into_subscriber).collect()
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn create_message(&self, subscriber_id: Uuid, content: String) -> Result<Message> {
    let raw = RawMessage {
      message_id:    encode_uuid(Uuid::new_v4()),
      subscriber_id: encode_uuid(subscriber_id),
      content,
      created_at:    encode_dt(now()),
    };

    let (id_str, sub_str, content, at_str) = (
      raw.message_id.clone(),
      raw.subscriber_id.clone(),
      raw.content.clone(),
      raw.created_at.clone(),
    );

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO messages (message_id, subscriber_id, content, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, sub_str, content, at_str],
        )?;
        Ok(())
      })
      .await?;

    raw.into_message()
  }

  // ── Social users ──────────────────────────────────────────────────────────

  async fn find_social_user(
    &self,
    provider: &str,
    provider_subject: &str,
  ) -> Result<Option<SocialUser>> {
    let provider = provider.to_owned();
    let subject  = provider_subject.to_owned();

    let raw: Option<RawSocialUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SOCIAL_USER_COLUMNS} FROM social_users
                  WHERE provider = ?1 AND provider_subject = ?2"
              ),
              rusqlite::params![provider, subject],
              RawSocialUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSocialUser::into_social_user).transpose()
  }

  async fn create_social_user(&self, input: NewSocialUser) -> Result<Insertion<SocialUser>> {
    let user = SocialUser {
      social_user_id:   Uuid::new_v4(),
      provider:         input.provider,
      provider_subject: input.provider_subject,
      name:             input.name,
      email:            input.email,
      avatar_url:       input.avatar_url,
      created_at:       now(),
    };

    let id_str   = encode_uuid(user.social_user_id);
    let provider = user.provider.clone();
    let subject  = user.provider_subject.clone();
    let name     = user.name.clone();
    let email    = user.email.clone();
    let avatar   = user.avatar_url.clone();
    let at_str   = encode_dt(user.created_at);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO social_users (
             social_user_id, provider, provider_subject, name, email, avatar_url, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, provider, subject, name, email, avatar, at_str],
        );
        match result {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(if inserted {
      Insertion::Inserted(user)
    } else {
      Insertion::Conflict(Conflict::SocialIdentity)
    })
  }
}

//! Integration tests for `SqliteStore` against an in-memory database.

use std::{sync::Arc, time::Duration};

use chrono::{TimeDelta, Utc};
use missive_core::{
  Error as WorkflowError, MessageIntake, SocialLogin, Subscriptions,
  mail::{Mailer, OutgoingMail, TransportError, spawn_outbox},
  oauth::{AuthError, CallbackParams, LoginRedirect, NormalizedProfile, OAuthAdapter},
  social::NewSocialUser,
  store::{Conflict, IdentityStore, Insertion},
  subscriber::NewSubscriber,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn pending(email: &str, token: &str) -> NewSubscriber {
  NewSubscriber {
    email:            email.into(),
    token:            token.into(),
    token_expires_at: None,
  }
}

fn github_user(subject: &str) -> NewSocialUser {
  NewSocialUser {
    provider:         "github".into(),
    provider_subject: subject.into(),
    name:             Some("Ada".into()),
    email:            Some("ada@example.com".into()),
    avatar_url:       Some("https://avatars.example/ada.png".into()),
  }
}

fn inserted<T>(i: Insertion<T>) -> T {
  match i {
    Insertion::Inserted(v) => v,
    Insertion::Conflict(c) => panic!("unexpected conflict: {c:?}"),
  }
}

// ─── Subscribers ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_find_subscriber() {
  let s = store().await;

  let created = inserted(s.create_subscriber(pending("a@x.com", "tok-a")).await.unwrap());
  assert!(!created.confirmed);
  assert_eq!(created.token.as_deref(), Some("tok-a"));

  let by_email = s.find_subscriber_by_email("a@x.com").await.unwrap().unwrap();
  assert_eq!(by_email, created);

  let by_token = s.find_subscriber_by_token("tok-a").await.unwrap().unwrap();
  assert_eq!(by_token.subscriber_id, created.subscriber_id);
}

#[tokio::test]
async fn missing_subscriber_returns_none() {
  let s = store().await;
  assert!(s.find_subscriber_by_email("nobody@x.com").await.unwrap().is_none());
  assert!(s.find_subscriber_by_token("nothing").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_an_email_conflict() {
  let s = store().await;
  inserted(s.create_subscriber(pending("a@x.com", "tok-1")).await.unwrap());

  let again = s.create_subscriber(pending("a@x.com", "tok-2")).await.unwrap();
  assert_eq!(again, Insertion::Conflict(Conflict::Email));
}

#[tokio::test]
async fn duplicate_token_is_a_token_conflict() {
  let s = store().await;
  inserted(s.create_subscriber(pending("a@x.com", "same")).await.unwrap());

  let again = s.create_subscriber(pending("b@x.com", "same")).await.unwrap();
  assert_eq!(again, Insertion::Conflict(Conflict::Token));
  assert!(s.find_subscriber_by_email("b@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn confirm_by_token_clears_token_once() {
  let s = store().await;
  inserted(s.create_subscriber(pending("a@x.com", "tok")).await.unwrap());

  let confirmed = s.confirm_by_token("tok", Utc::now()).await.unwrap().unwrap();
  assert!(confirmed.confirmed);
  assert!(confirmed.token.is_none());
  assert!(confirmed.confirmed_at.is_some());

  assert!(s.confirm_by_token("tok", Utc::now()).await.unwrap().is_none());
  assert!(s.find_subscriber_by_token("tok").await.unwrap().is_none());
}

#[tokio::test]
async fn confirm_ignores_expired_token() {
  let s = store().await;
  let mut input = pending("a@x.com", "tok");
  input.token_expires_at = Some(Utc::now() - TimeDelta::minutes(5));
  inserted(s.create_subscriber(input).await.unwrap());

  assert!(s.confirm_by_token("tok", Utc::now()).await.unwrap().is_none());
  let row = s.find_subscriber_by_email("a@x.com").await.unwrap().unwrap();
  assert!(!row.confirmed);
}

#[tokio::test]
async fn confirmed_subscribers_all_hold_null_tokens() {
  // NULL tokens do not collide under the UNIQUE constraint.
  let s = store().await;
  inserted(s.create_subscriber(pending("a@x.com", "t1")).await.unwrap());
  tokio::time::sleep(Duration::from_millis(2)).await;
  inserted(s.create_subscriber(pending("b@x.com", "t2")).await.unwrap());
  s.confirm_by_token("t1", Utc::now()).await.unwrap().unwrap();
  s.confirm_by_token("t2", Utc::now()).await.unwrap().unwrap();

  let listed = s.list_confirmed_subscribers().await.unwrap();
  let emails: Vec<_> = listed.iter().map(|s| s.email.as_str()).collect();
  assert_eq!(emails, ["a@x.com", "b@x.com"]);
}

#[tokio::test]
async fn reissue_token_only_touches_pending() {
  let s = store().await;
  inserted(s.create_subscriber(pending("a@x.com", "old")).await.unwrap());

  let reissued = s.reissue_token("a@x.com", "new".into(), None).await.unwrap().unwrap();
  assert_eq!(inserted(reissued).token.as_deref(), Some("new"));
  assert!(s.find_subscriber_by_token("old").await.unwrap().is_none());

  s.confirm_by_token("new", Utc::now()).await.unwrap().unwrap();
  assert!(s.reissue_token("a@x.com", "newer".into(), None).await.unwrap().is_none());
  assert!(s.reissue_token("nobody@x.com", "x".into(), None).await.unwrap().is_none());
}

#[tokio::test]
async fn reissue_token_reports_collision() {
  let s = store().await;
  inserted(s.create_subscriber(pending("a@x.com", "taken")).await.unwrap());
  inserted(s.create_subscriber(pending("b@x.com", "mine")).await.unwrap());

  let outcome = s.reissue_token("b@x.com", "taken".into(), None).await.unwrap();
  assert_eq!(outcome, Some(Insertion::Conflict(Conflict::Token)));
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_message_for_existing_subscriber() {
  let s = store().await;
  let sub = inserted(s.create_subscriber(pending("a@x.com", "t")).await.unwrap());

  let msg = s.create_message(sub.subscriber_id, "hello".into()).await.unwrap();
  assert_eq!(msg.subscriber_id, sub.subscriber_id);
  assert_eq!(msg.content, "hello");
}

#[tokio::test]
async fn create_message_for_unknown_subscriber_fails() {
  let s = store().await;
  assert!(s.create_message(Uuid::new_v4(), "orphan".into()).await.is_err());
}

// ─── Social users ────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_find_social_user() {
  let s = store().await;
  let user = inserted(s.create_social_user(github_user("42")).await.unwrap());

  let found = s.find_social_user("github", "42").await.unwrap().unwrap();
  assert_eq!(found, user);
  assert!(s.find_social_user("google", "42").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_social_identity_conflicts() {
  let s = store().await;
  inserted(s.create_social_user(github_user("42")).await.unwrap());
  let again = s.create_social_user(github_user("42")).await.unwrap();
  assert_eq!(again, Insertion::Conflict(Conflict::SocialIdentity));

  let mut other = github_user("42");
  other.provider = "google".into();
  inserted(s.create_social_user(other).await.unwrap());
}

// ─── Workflows over SQLite ───────────────────────────────────────────────────

struct Discard;

impl Mailer for Discard {
  async fn send(&self, _: &OutgoingMail) -> Result<(), TransportError> { Ok(()) }
}

fn subscriptions(store: Arc<SqliteStore>) -> Subscriptions<SqliteStore> {
  let (outbox, _worker) = spawn_outbox(Discard, 64, Duration::from_secs(1));
  Subscriptions::new(store, outbox, "http://localhost:8080")
}

#[tokio::test]
async fn end_to_end_subscribe_verify_submit() {
  let s = Arc::new(store().await);
  let subs = subscriptions(s.clone());
  let intake = MessageIntake::new(s.clone());

  let pending = subs.start("a@x.com").await.unwrap();
  let token = pending.token.clone().unwrap();
  assert_eq!(token.len(), 32);

  let confirmed = subs.verify(&token).await.unwrap();
  assert!(confirmed.confirmed);
  assert!(confirmed.token.is_none());

  let msg = intake.submit("a@x.com", "hi").await.unwrap();
  assert_eq!(msg.subscriber_id, pending.subscriber_id);
  assert_eq!(msg.content, "hi");
}

#[tokio::test]
async fn concurrent_starts_create_one_row() {
  let s = Arc::new(store().await);
  let subs = Arc::new(subscriptions(s.clone()));

  let tasks: Vec<_> = (0..16)
    .map(|_| {
      let subs = subs.clone();
      tokio::spawn(async move { subs.start("race@x.com").await })
    })
    .collect();

  let mut ok = 0;
  for task in tasks {
    match task.await.unwrap() {
      Ok(_) => ok += 1,
      Err(WorkflowError::AlreadySubscribed) => {}
      Err(other) => panic!("unexpected error: {other}"),
    }
  }
  assert_eq!(ok, 1);
}

#[tokio::test]
async fn concurrent_verifies_succeed_once() {
  let s = Arc::new(store().await);
  let subs = Arc::new(subscriptions(s.clone()));
  let token = subs.start("a@x.com").await.unwrap().token.unwrap();

  let tasks: Vec<_> = (0..16)
    .map(|_| {
      let subs = subs.clone();
      let token = token.clone();
      tokio::spawn(async move { subs.verify(&token).await })
    })
    .collect();

  let mut ok = 0;
  for task in tasks {
    match task.await.unwrap() {
      Ok(_) => ok += 1,
      Err(WorkflowError::InvalidToken) => {}
      Err(other) => panic!("unexpected error: {other}"),
    }
  }
  assert_eq!(ok, 1);

  let row = s.find_subscriber_by_email("a@x.com").await.unwrap().unwrap();
  assert!(row.confirmed);
  assert!(row.token.is_none());
}

struct FixedProfile;

impl OAuthAdapter for FixedProfile {
  fn begin_login(&self, _: &str) -> Result<LoginRedirect, AuthError> {
    Err(AuthError::UnknownProvider("unused".into()))
  }

  async fn complete_login(
    &self,
    _: &str,
    _: &CallbackParams,
    _: Option<&str>,
  ) -> Result<NormalizedProfile, AuthError> {
    Ok(NormalizedProfile {
      subject_id: "42".into(),
      name:       Some("Ada".into()),
      email:      None,
      avatar_url: None,
    })
  }
}

#[tokio::test]
async fn concurrent_social_callbacks_resolve_to_one_row() {
  let s = Arc::new(store().await);
  let login = Arc::new(SocialLogin::new(s.clone(), Arc::new(FixedProfile)));

  let tasks: Vec<_> = (0..8)
    .map(|_| {
      let login = login.clone();
      tokio::spawn(async move {
        login.complete("github", &CallbackParams::default(), None).await
      })
    })
    .collect();

  let mut ids = Vec::new();
  let mut created = 0;
  for task in tasks {
    let resolved = task.await.unwrap().unwrap();
    created += usize::from(resolved.created);
    ids.push(resolved.user.social_user_id);
  }
  assert_eq!(created, 1);
  assert!(ids.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn reopening_a_file_store_keeps_rows() {
  let dir = std::env::temp_dir().join(format!("missive-{}", Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("missive.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    inserted(s.create_subscriber(pending("a@x.com", "t")).await.unwrap());
  }
  let s = SqliteStore::open(&path).await.unwrap();
  assert!(s.find_subscriber_by_email("a@x.com").await.unwrap().is_some());

  std::fs::remove_dir_all(&dir).ok();
}

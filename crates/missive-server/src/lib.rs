//! HTTP surface for Missive.
//!
//! Exposes an axum [`Router`] over the subscription, message intake and
//! social-login workflows, backed by any [`IdentityStore`] and
//! [`OAuthAdapter`].

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod oauth;

pub use config::ServerConfig;
pub use error::Error;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use missive_core::{
  MessageIntake, SocialLogin, Subscriptions, mail::Outbox, oauth::OAuthAdapter,
  store::IdentityStore,
};
use tower_http::trace::TraceLayer;

use auth::AuthConfig;
use handlers::{admin, oauth as login, submit, subscribe};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, A> {
  pub subscriptions: Arc<Subscriptions<S>>,
  pub intake:        Arc<MessageIntake<S>>,
  pub social:        Arc<SocialLogin<S, A>>,
  pub config:        Arc<ServerConfig>,
  /// `None` disables the admin endpoints.
  pub admin:         Option<Arc<AuthConfig>>,
}

// Derived `Clone` would require `S: Clone` and `A: Clone`.
impl<S, A> Clone for AppState<S, A> {
  fn clone(&self) -> Self {
    Self {
      subscriptions: Arc::clone(&self.subscriptions),
      intake:        Arc::clone(&self.intake),
      social:        Arc::clone(&self.social),
      config:        Arc::clone(&self.config),
      admin:         self.admin.clone(),
    }
  }
}

impl<S, A> AppState<S, A>
where
  S: IdentityStore + 'static,
  A: OAuthAdapter + 'static,
{
  /// Wire the workflows over one shared store.
  pub fn new(store: S, adapter: A, outbox: Outbox, config: ServerConfig) -> Self {
    let store = Arc::new(store);
    let subscriptions = Subscriptions::new(Arc::clone(&store), outbox, config.base_url.clone())
      .with_token_ttl(config.token_ttl());

    Self {
      subscriptions: Arc::new(subscriptions),
      intake:        Arc::new(MessageIntake::new(Arc::clone(&store))),
      social:        Arc::new(SocialLogin::new(store, Arc::new(adapter))),
      admin:         config.admin().map(Arc::new),
      config:        Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the Missive API.
pub fn router<S, A>(state: AppState<S, A>) -> Router
where
  S: IdentityStore + 'static,
  A: OAuthAdapter + 'static,
{
  Router::new()
    .route("/subscribe",                post(subscribe::subscribe::<S, A>))
    .route("/verify",                   get(subscribe::verify::<S, A>))
    .route("/resend",                   post(subscribe::resend::<S, A>))
    .route("/submit",                   post(submit::submit::<S, A>))
    .route("/auth/{provider}",          get(login::begin::<S, A>))
    .route("/auth/{provider}/callback", get(login::callback::<S, A>))
    .route("/admin/subscribers",        get(admin::subscribers::<S, A>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

//! Core types, trait definitions and workflows for the Missive newsletter
//! backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! store, mail transport and OAuth providers are reached through the traits
//! in [`store`], [`mail`] and [`oauth`]; concrete implementations live in
//! `missive-store-sqlite` and `missive-server`.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod mail;
pub mod oauth;
pub mod social;
pub mod store;
pub mod subscriber;
pub mod token;
pub mod workflow;

pub use error::{Error, Result};
pub use workflow::{MessageIntake, Resolved, SocialLogin, Subscriptions};

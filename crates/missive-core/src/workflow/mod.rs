//! The request-scoped workflows: double opt-in subscription, message intake
//! and social-login reconciliation.
//!
//! Each service holds an `Arc` to the store it was constructed with and no
//! other mutable state; all coordination between concurrent requests happens
//! in the store.

pub mod intake;
pub mod social;
pub mod subscription;

pub use intake::MessageIntake;
pub use social::{Resolved, SocialLogin};
pub use subscription::Subscriptions;

//! Concrete mail transports behind [`missive_core::mail::Mailer`].

pub mod console;
pub mod smtp;

pub use console::ConsoleMailer;
pub use smtp::SmtpMailer;

use missive_core::mail::{Mailer, OutgoingMail, TransportError};

/// The transport picked at startup: SMTP when configured, the log otherwise.
pub enum MailTransport {
  Smtp(SmtpMailer),
  Console(ConsoleMailer),
}

impl Mailer for MailTransport {
  async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
    match self {
      MailTransport::Smtp(m) => m.send(mail).await,
      MailTransport::Console(m) => m.send(mail).await,
    }
  }
}

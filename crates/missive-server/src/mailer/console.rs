//! Development transport: writes each mail to the log.

use missive_core::mail::{Mailer, OutgoingMail, TransportError};

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMailer;

impl Mailer for ConsoleMailer {
  async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
    tracing::info!(
      to = %mail.to,
      subject = %mail.subject,
      body = %mail.body,
      "mail (console transport)"
    );
    Ok(())
  }
}

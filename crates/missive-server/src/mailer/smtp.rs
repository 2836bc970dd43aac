//! SMTP transport built on lettre's tokio executor.

use lettre::{
  AsyncSmtpTransport, AsyncTransport as _, Message, Tokio1Executor,
  message::{Mailbox, header::ContentType},
  transport::smtp::authentication::Credentials,
};
use missive_core::mail::{Mailer, OutgoingMail, TransportError};

use crate::config::SmtpSettings;

pub struct SmtpMailer {
  transport: AsyncSmtpTransport<Tokio1Executor>,
  from:      Mailbox,
}

impl SmtpMailer {
  /// Build the transport. No connection is made until the first send.
  pub fn new(settings: &SmtpSettings) -> Result<Self, TransportError> {
    let creds = Credentials::new(settings.username.clone(), settings.password.clone());

    // 465 is implicit TLS; everything else negotiates STARTTLS.
    let builder = if settings.port == 465 {
      AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
    } else {
      AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
    }
    .map_err(|e| TransportError(format!("failed to create SMTP transport: {e}")))?;

    let transport = builder.port(settings.port).credentials(creds).build();

    Ok(Self { transport, from: from_mailbox(settings)? })
  }
}

fn from_mailbox(settings: &SmtpSettings) -> Result<Mailbox, TransportError> {
  let address = settings
    .from_email
    .parse()
    .map_err(|e| TransportError(format!("invalid from address: {e}")))?;
  Ok(Mailbox::new(settings.from_name.clone(), address))
}

impl Mailer for SmtpMailer {
  async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
    let to: Mailbox = mail
      .to
      .parse()
      .map_err(|e| TransportError(format!("invalid recipient {}: {e}", mail.to)))?;

    let message = Message::builder()
      .from(self.from.clone())
      .to(to)
      .subject(mail.subject.as_str())
      .header(ContentType::TEXT_PLAIN)
      .body(mail.body.clone())
      .map_err(|e| TransportError(format!("failed to build mail: {e}")))?;

    self
      .transport
      .send(message)
      .await
      .map_err(|e| TransportError(format!("failed to send mail: {e}")))?;

    tracing::debug!(to = %mail.to, "mail sent");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn settings(from_name: Option<&str>) -> SmtpSettings {
    SmtpSettings {
      host:       "smtp.example.com".into(),
      port:       587,
      username:   "user".into(),
      password:   "pass".into(),
      from_email: "news@example.com".into(),
      from_name:  from_name.map(Into::into),
    }
  }

  #[test]
  fn from_mailbox_includes_display_name() {
    let mb = from_mailbox(&settings(Some("Missive"))).unwrap();
    assert_eq!(mb.to_string(), "Missive <news@example.com>");
    let bare = from_mailbox(&settings(None)).unwrap();
    assert_eq!(bare.to_string(), "news@example.com");
  }

  #[test]
  fn bad_from_address_is_rejected() {
    let mut s = settings(None);
    s.from_email = "not an address".into();
    assert!(from_mailbox(&s).is_err());
  }

  #[tokio::test]
  async fn builds_without_connecting() {
    assert!(SmtpMailer::new(&settings(None)).is_ok());
  }
}

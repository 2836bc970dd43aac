//! Mail dispatch: the [`Mailer`] transport trait and the bounded [`Outbox`].
//!
//! Workflows never talk to a transport directly. They hand an
//! [`OutgoingMail`] to the outbox, which returns immediately; a single worker
//! task performs delivery with a per-message timeout and logs failures. On
//! shutdown the worker drains whatever is still queued.

use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::{
  sync::{mpsc, oneshot},
  task::JoinHandle,
};

// ─── Messages ────────────────────────────────────────────────────────────────

/// A plain-text email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
  pub to:      String,
  pub subject: String,
  pub body:    String,
}

impl OutgoingMail {
  /// The double opt-in mail carrying the verification `link`.
  pub fn verification(to: &str, link: &str) -> Self {
    Self {
      to:      to.to_owned(),
      subject: "Please confirm your subscription".to_owned(),
      body:    format!(
        "Hello,\n\n\
         Please click the link below to confirm your subscription:\n\n\
         {link}\n\n\
         If you didn't request this, you can safely ignore this email.\n"
      ),
    }
  }
}

// ─── Transport ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("mail transport error: {0}")]
pub struct TransportError(pub String);

/// A mail transport (SMTP, console, test double).
pub trait Mailer: Send + Sync + 'static {
  fn send<'a>(
    &'a self,
    mail: &'a OutgoingMail,
  ) -> impl Future<Output = Result<(), TransportError>> + Send + 'a;
}

// ─── Outbox ──────────────────────────────────────────────────────────────────

/// Sending half of the outbox. Cheap to clone.
#[derive(Clone)]
pub struct Outbox {
  tx: mpsc::Sender<OutgoingMail>,
}

impl Outbox {
  /// Queue `mail` without waiting. Returns `false` (and logs) if the queue is
  /// full or the worker has shut down; the mail is dropped in that case.
  pub fn enqueue(&self, mail: OutgoingMail) -> bool {
    match self.tx.try_send(mail) {
      Ok(()) => true,
      Err(mpsc::error::TrySendError::Full(mail)) => {
        tracing::warn!(to = %mail.to, "outbox full, dropping mail");
        false
      }
      Err(mpsc::error::TrySendError::Closed(mail)) => {
        tracing::warn!(to = %mail.to, "outbox closed, dropping mail");
        false
      }
    }
  }
}

/// Delivery counters reported when the worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
  pub sent:   usize,
  pub failed: usize,
}

/// Handle to the background delivery task.
pub struct OutboxWorker {
  shutdown: oneshot::Sender<()>,
  handle:   JoinHandle<DeliveryStats>,
}

impl OutboxWorker {
  /// Stop accepting new mail, deliver everything already queued, and wait for
  /// the worker to finish.
  pub async fn shutdown(self) -> DeliveryStats {
    // The worker may already be gone; either way it stops accepting mail.
    let _ = self.shutdown.send(());
    match self.handle.await {
      Ok(stats) => stats,
      Err(e) => {
        tracing::error!(error = %e, "outbox worker panicked");
        DeliveryStats::default()
      }
    }
  }
}

/// Spawn the delivery worker on the current tokio runtime.
///
/// `capacity` bounds the number of queued mails; `send_timeout` bounds each
/// individual delivery attempt.
pub fn spawn_outbox<M: Mailer>(
  mailer: M,
  capacity: usize,
  send_timeout: Duration,
) -> (Outbox, OutboxWorker) {
  let (tx, rx) = mpsc::channel(capacity.max(1));
  let (shutdown_tx, shutdown_rx) = oneshot::channel();
  let handle = tokio::spawn(run(mailer, rx, shutdown_rx, send_timeout));
  (Outbox { tx }, OutboxWorker { shutdown: shutdown_tx, handle })
}

async fn run<M: Mailer>(
  mailer: M,
  mut rx: mpsc::Receiver<OutgoingMail>,
  mut shutdown: oneshot::Receiver<()>,
  send_timeout: Duration,
) -> DeliveryStats {
  let mut stats = DeliveryStats::default();

  loop {
    tokio::select! {
      _ = &mut shutdown => {
        rx.close();
        break;
      }
      next = rx.recv() => match next {
        Some(mail) => deliver(&mailer, &mail, send_timeout, &mut stats).await,
        None => return stats,
      },
    }
  }

  // Drain what was queued before the close.
  while let Some(mail) = rx.recv().await {
    deliver(&mailer, &mail, send_timeout, &mut stats).await;
  }
  tracing::info!(sent = stats.sent, failed = stats.failed, "outbox drained");
  stats
}

async fn deliver<M: Mailer>(
  mailer: &M,
  mail: &OutgoingMail,
  send_timeout: Duration,
  stats: &mut DeliveryStats,
) {
  match tokio::time::timeout(send_timeout, mailer.send(mail)).await {
    Ok(Ok(())) => {
      stats.sent += 1;
      tracing::info!(to = %mail.to, subject = %mail.subject, "mail sent");
    }
    Ok(Err(e)) => {
      stats.failed += 1;
      tracing::error!(to = %mail.to, error = %e, "mail delivery failed");
    }
    Err(_) => {
      stats.failed += 1;
      tracing::error!(to = %mail.to, timeout = ?send_timeout, "mail delivery timed out");
    }
  }
}

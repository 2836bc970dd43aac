//! missive server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `MISSIVE_*` environment variables, opens the SQLite store, starts the mail
//! outbox and serves the HTTP API until interrupted.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `admin_password_hash`:
//!
//! ```
//! cargo run -p missive-server --bin missive -- --hash-password
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use missive_core::mail::spawn_outbox;
use missive_server::{
  AppState, ServerConfig,
  mailer::{ConsoleMailer, MailTransport, SmtpMailer},
  oauth::ProviderSet,
};
use missive_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Missive newsletter server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let config = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = expand_tilde(&config.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let transport = match &config.smtp {
    Some(smtp) => {
      tracing::info!(host = %smtp.host, port = smtp.port, "delivering mail over SMTP");
      MailTransport::Smtp(SmtpMailer::new(smtp).context("failed to configure SMTP")?)
    }
    None => {
      tracing::warn!("no [smtp] configured, mail will only be logged");
      MailTransport::Console(ConsoleMailer)
    }
  };
  let (outbox, worker) = spawn_outbox(transport, config.outbox_capacity, config.mail_timeout());

  let providers = ProviderSet::new(&config.base_url, &config.providers, config.provider_timeout())
    .context("failed to build OAuth HTTP client")?;
  tracing::info!(providers = ?providers.enabled(), "social login");

  if config.admin().is_none() {
    tracing::info!("admin credentials not configured, admin endpoints disabled");
  }

  let address = format!("{}:{}", config.host, config.port);
  let app = missive_server::router(AppState::new(store, providers, outbox, config));

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  // The router (and with it every outbox sender) is gone; flush what is left.
  let stats = worker.shutdown().await;
  tracing::info!(sent = stats.sent, failed = stats.failed, "mail outbox drained");

  Ok(())
}

async fn shutdown_signal() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => tracing::info!("shutting down"),
    Err(e) => {
      tracing::error!(error = %e, "failed to listen for ctrl-c");
      std::future::pending::<()>().await
    }
  }
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

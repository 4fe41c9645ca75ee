//! Empire Run backoffice server
//!
//! Serves orders, license issuance and activation, gameplay reports,
//! moderation and cloud saves over HTTP, backed by one SQLite file.
//!
//! Usage:
//!   ADMIN_TOKEN=secret empire-server --port 4000 --database empire.db

use std::{path::PathBuf, sync::Arc, time::Duration};
use anyhow::{bail, Context, Result};
use clap::Parser;
use empire_db::Db;
use empire_mail::{EmailSender, HttpMailer, HttpMailerConfig, LogMailer};
use empire_server::{build_router, AppState, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "empire-server")]
#[command(about = "Empire Run backoffice HTTP service")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, env = "PORT", default_value = "4000")]
    port: u16,

    /// Path to the SQLite store
    #[arg(short, long, env = "DATABASE_PATH", default_value = "empire.db")]
    database: PathBuf,

    /// Shared credential for /api/admin routes
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    admin_token: String,

    /// Mail provider send endpoint; license emails are only logged when unset
    #[arg(long, env = "MAIL_ENDPOINT")]
    mail_endpoint: Option<String>,

    /// Bearer token for the mail provider
    #[arg(long, env = "MAIL_API_KEY", hide_env_values = true)]
    mail_api_key: Option<String>,

    /// Sender address for outgoing mail
    #[arg(long, env = "MAIL_FROM", default_value = "Empire Run <no-reply@empirerun.game>")]
    mail_from: String,

    /// Seconds to wait for the mail provider during order approval
    #[arg(long, env = "MAIL_TIMEOUT_SECS", default_value = "15")]
    mail_timeout_secs: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Empire backoffice starting...");
    if args.admin_token.trim().is_empty() {
        bail!("ADMIN_TOKEN must not be empty");
    }

    let db = Db::open(&args.database)
        .with_context(|| format!("Failed to open store at {}", args.database.display()))?;
    info!("Store ready (schema version {})", db.schema_version().await?);

    let mail_timeout = Duration::from_secs(args.mail_timeout_secs);
    let mailer = build_mailer(&args, mail_timeout)?;
    let config = ServerConfig {
        admin_token: args.admin_token.clone(),
        mail_timeout,
    };
    let app = build_router(AppState::new(db, mailer, config));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", args.port))?;
    info!("HTTP API listening on port {}", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Empire backoffice stopped");
    Ok(())
}

fn build_mailer(args: &Args, timeout: Duration) -> Result<Arc<dyn EmailSender>> {
    let Some(endpoint) = &args.mail_endpoint else {
        warn!("No mail endpoint configured, license emails will only be logged");
        return Ok(Arc::new(LogMailer));
    };

    let mailer = HttpMailer::new(HttpMailerConfig {
        endpoint: endpoint.clone(),
        api_key: args.mail_api_key.clone(),
        from: args.mail_from.clone(),
        request_timeout: timeout,
    })
    .context("Invalid mail configuration")?;
    info!("Sending mail via {}", endpoint);
    Ok(Arc::new(mailer))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

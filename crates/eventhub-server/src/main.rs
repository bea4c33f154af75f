//! `EventHub` Server
//!
//! HTTP service issuing signed QR codes and verifying them at check-in.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use eventhub_crypto::SignatureEngine;
use eventhub_server::auth::{JwtManager, Role};
use eventhub_server::http::{AppState, build_router};
use eventhub_server::storage::EventDatabase;

/// Signing key used only with `--insecure-dev-secret`.
const DEV_QR_SECRET: &str = "eventhub-dev-qr-secret-do-not-use";

#[derive(Parser, Debug)]
#[command(name = "eventhub-server")]
#[command(version, about = "EventHub server - QR issuance and attendance verification")]
struct Args {
    /// Address to listen on (overrides config).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file (overrides config).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Explicit JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// HMAC secret for signing QR payloads.
    #[arg(long, env = "QR_CODE_SECRET", hide_env_values = true)]
    qr_secret: Option<String>,

    /// Start with a fixed development QR secret when none is configured.
    #[arg(long)]
    insecure_dev_secret: bool,

    /// Secret for validating bearer tokens.
    #[arg(long, env = "EVENTHUB_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// OpenTelemetry OTLP endpoint for traces and metrics export
    /// (e.g. `http://localhost:4317`). Requires the `metrics` feature.
    #[cfg(feature = "metrics")]
    #[arg(long, env = "EVENTHUB_METRICS_ENDPOINT")]
    metrics_endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mint an access token for a user (operator tooling).
    Token {
        /// Internal user id placed in the `sub` claim.
        #[arg(long)]
        user_id: String,

        /// Role claim: student, admin or master.
        #[arg(long, default_value = "student")]
        role: Role,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = eventhub_core::config::load_config(args.config.as_deref())?;

    // Held until the server stops, then shut down to flush the OTel pipeline.
    let log_filter = format!("eventhub_server={}", config.server.log_level);
    #[cfg(feature = "metrics")]
    let metrics_guard = eventhub_core::tracing_init::init_tracing_with_metrics(
        &log_filter,
        args.log_json,
        args.metrics_endpoint.as_deref(),
    );
    #[cfg(not(feature = "metrics"))]
    eventhub_core::tracing_init::init_tracing(&log_filter, args.log_json);

    let jwt = Arc::new(JwtManager::new(
        args.jwt_secret.as_bytes(),
        config.auth.access_ttl_secs,
    ));

    if let Some(Command::Token { user_id, role }) = &args.command {
        let (token, ttl) = jwt
            .issue_access_token(user_id, *role)
            .context("Failed to mint access token")?;
        info!(user_id = %user_id, role = %role, ttl, "Access token minted");
        #[allow(clippy::print_stdout)]
        {
            println!("{token}");
        }
        return Ok(());
    }

    let engine = Arc::new(signature_engine(&args)?);

    let addr = args.addr.unwrap_or(config.server.listen_addr);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        "Starting eventhub-server"
    );

    let db_path = match args.db_path.clone().or(config.server.database_path.clone()) {
        Some(path) => path,
        None => eventhub_core::config::default_database_path()
            .context("Cannot determine default database path")?,
    };
    info!(path = %db_path.display(), "Opening event database");
    let db = EventDatabase::open(&db_path).await?;

    let state = AppState::new(db, engine, jwt, &config.server.public_base_url);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
            }
        })
        .await?;

    info!("Server stopped");

    #[cfg(feature = "metrics")]
    if let Err(e) = eventhub_core::tracing_init::shutdown_tracing(metrics_guard) {
        warn!(error = %e, "Failed to flush telemetry on shutdown");
    }
    Ok(())
}

/// Build the QR signing engine, refusing to start without a real secret
/// unless explicitly told otherwise.
fn signature_engine(args: &Args) -> anyhow::Result<SignatureEngine> {
    match args.qr_secret.as_deref().filter(|s| !s.is_empty()) {
        Some(secret) => Ok(SignatureEngine::new(secret.as_bytes())?),
        None if args.insecure_dev_secret => {
            warn!("QR_CODE_SECRET is not set; signing with the INSECURE development secret");
            Ok(SignatureEngine::new(DEV_QR_SECRET.as_bytes())?)
        }
        None => anyhow::bail!(
            "QR_CODE_SECRET is not set; refusing to start (pass --insecure-dev-secret for local development)"
        ),
    }
}

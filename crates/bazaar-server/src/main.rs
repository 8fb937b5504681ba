use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bazaar_core::config::{self, Config};
use bazaar_server::blob::FsBlobStore;
use bazaar_server::notifications::{LogNotifier, Notifier, WebhookNotifier};
use bazaar_server::storage::MarketDatabase;
use bazaar_server::web::{AppState, build_router};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "bazaar-server", version, about = "Bazaar marketplace server")]
struct Args {
    /// Settings file (JSON). Defaults to the global settings file if present.
    #[arg(long, env = "BAZAAR_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides the settings file).
    #[arg(long)]
    addr: Option<String>,

    /// Database path.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Directory for uploaded product images.
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "BAZAAR_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn apply(self, mut config: Config) -> Config {
        if let Some(addr) = self.addr {
            config.server.addr = addr;
        }
        if let Some(path) = self.db_path {
            config.storage.database_path = Some(path);
        }
        if let Some(dir) = self.upload_dir {
            config.storage.upload_dir = dir;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    bazaar_core::tracing_init::init_tracing("bazaar_server=info", args.log_json);

    let config = config::load_config(args.config.as_deref())?;
    let config = args.apply(config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr,
        "Starting bazaar-server"
    );

    let db_path = match &config.storage.database_path {
        Some(path) => path.clone(),
        None => config::default_database_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine data directory"))?,
    };
    info!(path = %db_path.display(), "Opening market database");
    let db = MarketDatabase::open(&db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let notifier: Arc<dyn Notifier> = match (&config.mail.webhook_url, config.mail.suppress_send) {
        (Some(url), false) => {
            info!(url = %url, "Seller notifications via webhook");
            Arc::new(WebhookNotifier::new(url.as_str(), config.mail.default_sender.as_str())?)
        }
        _ => {
            info!("Seller notifications suppressed (logged only)");
            Arc::new(LogNotifier::new(config.mail.default_sender.as_str()))
        }
    };

    let upload_dir = config.storage.upload_dir.clone();
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", upload_dir.display()))?;

    let state = AppState {
        db: db.clone(),
        blobs: Arc::new(FsBlobStore::new(&upload_dir)),
        notifier,
        upload_dir,
        session_ttl_secs: config.sessions.ttl_secs,
        max_body_bytes: config.server.max_body_bytes,
    };

    // Spawn background task to purge expired sessions
    let cleanup_db = db.clone();
    let cleanup_every = Duration::from_secs(config.sessions.cleanup_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_every);
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            match cleanup_db.delete_expired_sessions().await {
                Ok(removed) if removed > 0 => {
                    info!(removed, "Expired sessions purged");
                }
                Err(e) => {
                    warn!(error = %e, "Session cleanup failed");
                }
                _ => {}
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr))?;
    info!(addr = %config.server.addr, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Server stopped");
    Ok(())
}

//! Note vault server
//!
//! Serves the vault/file API and mirrors edits to Google Drive when an
//! access token is configured.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vault_core::{EditorEvent, EventBus, MemStore, Mirror, NoteService, Store};
use vault_server::config::Config;
use vault_server::drive_http::HttpDrive;
use vault_server::{AppState, router};

#[derive(Parser, Debug)]
#[command(name = "vault-server")]
#[command(about = "Markdown note vault with Google Drive mirroring")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 5000, env = "VAULT_PORT")]
    port: u16,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "VAULT_BIND")]
    bind: String,

    /// Path to config directory
    #[arg(long, default_value = "./config", env = "VAULT_CONFIG_PATH")]
    config_path: String,

    /// Google Drive access token (overrides the config file)
    #[arg(long, env = "DRIVE_ACCESS_TOKEN", hide_env_values = true)]
    drive_token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vault_server=info,vault_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config_path)?;

    let store: Arc<dyn Store> = if config.seed_demo_data {
        Arc::new(MemStore::with_demo_data()?)
    } else {
        Arc::new(MemStore::new())
    };

    let mirror = match cli.drive_token.or_else(|| config.drive.access_token.clone()) {
        Some(token) => {
            tracing::info!("Mirroring to Google Drive at {}", config.drive.api_base);
            Mirror::new(Arc::new(HttpDrive::new(token, &config.drive)?))
        }
        None => {
            tracing::info!("No Drive access token; running local-only");
            Mirror::disabled()
        }
    };

    let events = Arc::new(EventBus::new());
    let _event_log = events.subscribe(|event| match event {
        EditorEvent::SaveFailed { file_id, .. } => {
            tracing::warn!("Save failed for file {}", file_id)
        }
        other => tracing::debug!("Event: {:?}", other),
    });

    let state = Arc::new(AppState {
        service: NoteService::new(store, mirror, events),
        autosave: config.autosave.to_config(),
    });
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    tracing::info!("Starting vault-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Vault server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

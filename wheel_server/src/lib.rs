//! Daily invite wheel server. Callers are identified by the `user_id` they
//! send, so deploy it behind a proxy that authenticates them.

use std::sync::Arc;

use tokio::{net::TcpListener, signal};
use tracing::info;
use wheel_core::{OsEntropy, SystemClock, WheelConfig};

pub mod config;
pub mod error;
pub mod routes;
pub mod service;
pub mod store;

use config::ServerConfig;
use routes::AppState;
use service::{SpinService, SpinSettings};
use store::SqliteStore;

pub fn settings_from(config: &ServerConfig) -> SpinSettings {
    SpinSettings {
        wheel: WheelConfig::default(),
        utc_offset: config.utc_offset,
        invites_per_win: config.invites_per_win,
        invite_expiration_days: config.invite_expiration_days,
    }
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    info!("Opening database {}", config.database_url);
    let store = SqliteStore::open(&config.database_url).await?;

    let service = SpinService::new(
        Arc::new(store),
        Arc::new(OsEntropy),
        Arc::new(SystemClock),
        settings_from(&config),
    );
    let state = Arc::new(AppState {
        service,
        api_key: config.api_key.clone(),
    });
    let app = routes::router(state);

    let listener = TcpListener::bind(&config.bind).await?;
    info!("listening on {}", config.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {e}");
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
}

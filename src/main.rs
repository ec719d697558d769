use clap::Parser;
use tracing_subscriber::EnvFilter;

use waypost::config::{self, Environment};
use waypost::database::open_store;
use waypost::server::{app, AppState};

#[derive(Parser)]
#[command(name = "waypost")]
#[command(about = "Waypost user account API server")]
#[command(version)]
struct Args {
    #[arg(long, help = "Port to listen on (overrides WAYPOST_PORT)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = config::config().clone();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::info!("Starting Waypost API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        if config.environment == Environment::Development {
            tracing::warn!("JWT_SECRET is empty; every bearer token will be rejected");
        } else {
            anyhow::bail!("JWT_SECRET must be set outside development");
        }
    }

    let store = open_store(&config.database).await?;
    let bind_addr = config.bind_addr();
    let state = AppState::new(config, store)?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Waypost API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

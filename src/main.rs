use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use stylize_relay::{router, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stylize_relay=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    match &config.relay {
        Some(relay) => info!(prefix = %relay.prefix, origin = %relay.origin, mode = ?relay.mode, "image relay enabled"),
        None => info!("image relay disabled, returning upstream URLs directly"),
    }

    let state = Arc::new(AppState::new(config).context("failed to build HTTP client")?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Server is running on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

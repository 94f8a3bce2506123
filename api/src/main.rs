use anyhow::{Context, Result};
use api::{router, AppState};
use shared::{init_tracing, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_file.as_deref(), config.log_json)?;

    info!("Starting Brent dashboard API server...");

    let state = AppState::from_config(&config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.api_bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.api_bind_addr))?;
    info!("API server listening on http://{}", config.api_bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

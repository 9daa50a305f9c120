use std::sync::Arc;

use paperflow_api::app::{build_app, services::AppServices};
use paperflow_infra::config::{ApiConfig, load_dotenv};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    paperflow_observability::init();

    let config = ApiConfig::from_env()?;
    let services = AppServices::from_config(config.clone())?;
    if services.extractor().is_none() {
        tracing::warn!("OPENAI_API_KEY not set; /extract is disabled");
    }

    let app = build_app(Arc::new(services));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown requested");
    }
}

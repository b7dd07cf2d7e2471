use anyhow::Result;
use image_cascade::{
    config::AppConfig,
    logging,
    mcp_server::ImageCascadeServer,
    routes::{AppState, build_router},
};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let config = AppConfig::from_env();
    let bind_address = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        environment = %config.environment,
        data_dir = %config.data_dir.display(),
        "starting image-cascade"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(config).with_shutdown(shutdown_rx);

    let state_for_service = state.clone();
    let service = StreamableHttpService::new(
        move || Ok(ImageCascadeServer::new(state_for_service.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = build_router(state).nest_service("/mcp", service);
    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!(address = %bind_address, "listening; MCP endpoint at /mcp");

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        })
        .await?;
    Ok(())
}

use axum::{Router, routing::get};
use std::net::SocketAddr;
use tracing::info;

pub fn health_router() -> Router {
    // /healthz for liveness, /readyz for readiness probes
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }))
}

pub async fn run_http_server(addr: SocketAddr) -> anyhow::Result<()> {
    info!("health endpoints listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, health_router())
        .await?;
    Ok(())
}

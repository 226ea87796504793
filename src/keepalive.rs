//! Minimal HTTP endpoint so free hosting tiers keep the process awake.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tracing::info;

async fn root() -> &'static str {
    "Trade journal bot is alive"
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Keep-alive listening on {}", listener.local_addr()?);
    axum::serve(listener, router()).await?;
    Ok(())
}

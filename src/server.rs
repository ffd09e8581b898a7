//! HTTP surface of the function: Telegram posts updates here.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::handler::Handler;

pub fn router(handler: Arc<Handler>) -> Router {
    Router::new()
        .route("/", post(webhook))
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .with_state(handler)
}

async fn webhook(State(handler): State<Arc<Handler>>, body: String) -> (StatusCode, String) {
    let response = handler.handle(&body).await;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, response.body)
}

async fn health() -> &'static str {
    "ok"
}

pub async fn serve(handler: Arc<Handler>, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening for webhooks on {}", listener.local_addr()?);

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}

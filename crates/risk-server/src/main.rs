//! Portfolio risk advisor HTTP server
//!
//! Axum-based server exposing the risk engine over a small REST API.

mod config;
mod handlers;
mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::handlers::{analyze, analyze_report, health_check};
use crate::state::AppState;

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/analyze", post(analyze))
        .route("/api/analyze/report", post(analyze_report))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before reading RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let (engine, rules_source) = config.build_engine()?;
    tracing::info!("Risk rules loaded from {}", rules_source);

    let state = AppState::new(engine, rules_source);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("risk-server running on http://{}", config.bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health              - Health check");
    tracing::info!("  POST /api/analyze         - Risk assessment");
    tracing::info!("  POST /api/analyze/report  - Assessment with metrics");

    axum::serve(listener, app).await?;

    Ok(())
}

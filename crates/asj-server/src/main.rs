//! asj-server entry point.
//!
//! This file is intentionally thin: it sets up tracing, loads configuration,
//! builds the shared state, wires middleware, and starts the HTTP server.
//! All route handlers live in `routes.rs`; shared state types in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use asj_server::{routes, state};
use axum::http::{HeaderValue, Method};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

const ENV_CONFIG_PATHS: &str = "ASJ_CONFIG";
const ENV_BIND_ADDR: &str = "ASJ_SERVER_ADDR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config_paths = std::env::var(ENV_CONFIG_PATHS)
        .with_context(|| format!("missing env var {ENV_CONFIG_PATHS} (colon-separated YAML paths)"))?;
    let paths: Vec<&str> = config_paths.split(':').filter(|p| !p.is_empty()).collect();
    let loaded = asj_config::load_layered_yaml(&paths)?;
    let show = loaded.show()?;
    info!(config_hash = %loaded.config_hash, show = %show.name, "configuration loaded");

    let pool = asj_db::connect_from_env().await?;
    asj_db::migrate(&pool).await?;

    let secrets = state::Secrets::from_env();
    let shared = state::AppState::new(pool, show, secrets);

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8880)));
    info!("asj-server listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var(ENV_BIND_ADDR).ok()?.parse().ok()
}

/// CORS: the kiosk and admin pages are served from localhost in development.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(tower_http::cors::Any)
}

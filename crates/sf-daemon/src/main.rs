//! sf-daemon entry point.
//!
//! Thin on purpose: tracing, config, pool, middleware, serve. All route
//! handlers live in `routes.rs`; shared state lives in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use sf_config::{load_layered_yaml, report_unused_keys, resolve_database_url, split_config_paths, UnusedKeyPolicy};
use sf_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

const ENV_CONFIG_PATHS: &str = "SF_CONFIG";
const ENV_DAEMON_ADDR: &str = "SF_DAEMON_ADDR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();
    state::uptime_secs();

    let paths = std::env::var(ENV_CONFIG_PATHS)
        .map(|raw| split_config_paths(&raw))
        .unwrap_or_default();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&path_refs).context("load config failed")?;
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for pointer in &report.unused_leaf_pointers {
        warn!(pointer = %pointer, "config key is not used by this build");
    }
    let config = loaded.shop()?;
    info!(config_hash = %loaded.config_hash, layers = paths.len(), "config loaded");

    let db_url = resolve_database_url(&config)?;
    let pool = sf_db::connect(db_url.expose(), config.database.max_connections).await?;
    if config.database.migrate_on_boot {
        sf_db::migrate(&pool).await?;
        info!("migrations applied");
    }

    let addr = bind_addr(&config.server.bind_addr)?;
    let shared = Arc::new(state::AppState::new(pool, config, loaded.config_hash));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    info!("sf-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    shared.pool.close().await;
    info!("sf-daemon stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `SF_DAEMON_ADDR` overrides `server.bind_addr`.
fn bind_addr(configured: &str) -> anyhow::Result<SocketAddr> {
    let raw = std::env::var(ENV_DAEMON_ADDR).unwrap_or_else(|_| configured.to_string());
    raw.parse()
        .with_context(|| format!("invalid bind address: {raw}"))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler failed; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// CORS: allow only localhost origins.
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
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}

//! Shared runtime state for sf-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The only live resource
//! is the connection pool; everything else is read-only after boot.

use serde::{Deserialize, Serialize};
use sf_config::ShopConfig;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: ShopConfig,
    /// Hash of the layered config this process booted with.
    pub config_hash: String,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(pool: PgPool, config: ShopConfig, config_hash: String) -> Self {
        Self {
            pool,
            config,
            config_hash,
            build: BuildInfo {
                service: "sf-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }

    pub fn session_cookie(&self) -> &str {
        &self.config.server.session_cookie
    }

    pub fn page_size(&self) -> i64 {
        i64::from(self.config.catalog.page_size)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Seconds since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

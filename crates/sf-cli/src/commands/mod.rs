//! Command handler modules for sf-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod carts;
pub mod catalog;
pub mod orders;

use anyhow::{Context, Result};
use sf_config::{report_unused_keys, LoadedConfig, ShopConfig, UnusedKeyPolicy};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load `--config` layers (none means all defaults) and warn on unused keys.
pub fn load_config(paths: &[String]) -> Result<(LoadedConfig, ShopConfig)> {
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = sf_config::load_layered_yaml(&path_refs)?;
    warn_unused(&loaded, UnusedKeyPolicy::Warn)?;
    let cfg = loaded.shop()?;
    Ok((loaded, cfg))
}

/// Pool for the database named by `database.url_env`.
pub async fn connect(config_paths: &[String]) -> Result<(PgPool, ShopConfig)> {
    let (_, cfg) = load_config(config_paths)?;
    let url = sf_config::resolve_database_url(&cfg)?;
    let pool = sf_db::connect(url.expose(), 2)
        .await
        .with_context(|| format!("connect via {} failed", url.env_var))?;
    Ok((pool, cfg))
}

fn warn_unused(loaded: &LoadedConfig, policy: UnusedKeyPolicy) -> Result<()> {
    let report = report_unused_keys(&loaded.config_json, policy)?;
    if !report.is_clean() {
        eprintln!(
            "WARN: CONFIG_UNUSED_KEYS unused_leaf_keys={}",
            report.unused_leaf_pointers.len()
        );
        for p in report.unused_leaf_pointers.iter().take(50) {
            eprintln!("  unused={}", p);
        }
        let extra = report.unused_leaf_pointers.len().saturating_sub(50);
        if extra > 0 {
            eprintln!("  ... and {} more", extra);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config-hash
// ---------------------------------------------------------------------------

pub fn config_hash(paths: &[String], fail_unused: bool) -> Result<()> {
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = sf_config::load_layered_yaml(&path_refs)?;
    let policy = if fail_unused {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    warn_unused(&loaded, policy)?;
    // Typed validation, so a bad value fails here rather than at daemon boot.
    loaded.shop()?;

    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

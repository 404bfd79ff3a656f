//! `sf carts purge`: abandoned anonymous cart cleanup.

use anyhow::Result;
use chrono::Utc;

pub async fn purge(config_paths: &[String], ttl_days: Option<u32>) -> Result<()> {
    let (pool, cfg) = super::connect(config_paths).await?;
    let ttl_days = ttl_days.unwrap_or(cfg.cart.anonymous_ttl_days);
    let purged = sf_db::cart::purge_stale_anonymous_carts(&pool, ttl_days, Utc::now()).await?;
    println!("carts_purged={} ttl_days={}", purged, ttl_days);
    Ok(())
}

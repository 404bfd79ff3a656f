use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sf_core::checkout::StockPolicy;
use sf_core::status::TransitionPolicy;

/// Typed storefront settings. Every field has a default, so an empty config
/// is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub cart: CartSettings,
    pub checkout: CheckoutSettings,
    pub orders: OrderSettings,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    /// Cookie carrying the anonymous session key.
    pub session_cookie: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_cookie: "sf_session".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Name of the env var holding the connection URL.
    pub url_env: String,
    pub max_connections: u32,
    pub migrate_on_boot: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url_env: "SF_DATABASE_URL".to_string(),
            max_connections: 10,
            migrate_on_boot: true,
        }
    }
}

/// Upper bound for `cart.anonymous_ttl_days` (ten years).
pub const MAX_ANONYMOUS_TTL_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSettings {
    /// Anonymous carts untouched for this many days are purged.
    pub anonymous_ttl_days: u32,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            anonymous_ttl_days: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutSettings {
    pub stock_policy: StockPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSettings {
    pub transition_policy: TransitionPolicy,
    pub my_orders_default_days: u32,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            transition_policy: TransitionPolicy::Open,
            my_orders_default_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub page_size: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self { page_size: 12 }
    }
}

impl ShopConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: ShopConfig =
            serde_json::from_value(config_json.clone()).context("config does not match schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.database.url_env.trim().is_empty() {
            bail!("CONFIG_INVALID: database.url_env must name an env var");
        }
        if self.database.max_connections == 0 {
            bail!("CONFIG_INVALID: database.max_connections must be >= 1");
        }
        if self.catalog.page_size == 0 {
            bail!("CONFIG_INVALID: catalog.page_size must be >= 1");
        }
        if self.cart.anonymous_ttl_days == 0 || self.cart.anonymous_ttl_days > MAX_ANONYMOUS_TTL_DAYS {
            bail!(
                "CONFIG_INVALID: cart.anonymous_ttl_days must be within 1..={}",
                MAX_ANONYMOUS_TTL_DAYS
            );
        }
        if self.server.session_cookie.trim().is_empty() {
            bail!("CONFIG_INVALID: server.session_cookie must not be empty");
        }
        Ok(())
    }
}

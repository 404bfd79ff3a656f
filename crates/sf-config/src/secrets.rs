//! Runtime secret resolution.
//!
//! Config stores the env var NAME (`database.url_env`); the value is read
//! once at startup and passed to constructors. Errors name the variable and
//! never echo the value.

use anyhow::{bail, Result};

use crate::ShopConfig;

/// Database connection URL. Redacted in `Debug`.
#[derive(Clone)]
pub struct DatabaseUrl {
    pub env_var: String,
    value: String,
}

impl DatabaseUrl {
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Debug for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseUrl")
            .field("env_var", &self.env_var)
            .field("value", &"<REDACTED>")
            .finish()
    }
}

pub fn resolve_database_url(cfg: &ShopConfig) -> Result<DatabaseUrl> {
    let name = cfg.database.url_env.trim();
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(DatabaseUrl {
            env_var: name.to_string(),
            value: v,
        }),
        _ => bail!("SECRETS_MISSING: required env var '{name}' (database url) is not set or empty"),
    }
}

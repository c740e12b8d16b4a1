//! Runtime configuration from environment variables

use anyhow::Context;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without one the in-memory stores are used.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub default_currency: String,
    pub default_uncovered_percent: Decimal,
    pub catalog_cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "0.0.0.0".to_string(),
            port: 3000,
            db_max_connections: 5,
            default_currency: "PEN".to_string(),
            default_uncovered_percent: Decimal::from(30),
            catalog_cache_ttl: Duration::from_secs(300),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let default_currency = env::var("DEFAULT_CURRENCY")
            .map(|c| c.trim().to_ascii_uppercase())
            .unwrap_or(defaults.default_currency);
        if default_currency.len() != 3
            || !default_currency.chars().all(|c| c.is_ascii_alphabetic())
        {
            anyhow::bail!(
                "DEFAULT_CURRENCY must be a 3-letter code, got {}",
                default_currency
            );
        }

        let default_uncovered_percent =
            parse_var("DEFAULT_UNCOVERED_PERCENT", defaults.default_uncovered_percent)?;
        if default_uncovered_percent < Decimal::ZERO
            || default_uncovered_percent > Decimal::ONE_HUNDRED
        {
            anyhow::bail!("DEFAULT_UNCOVERED_PERCENT must be between 0 and 100");
        }

        // also the cache warmer interval, which must be non-zero
        let cache_ttl_secs: u64 =
            parse_var("CATALOG_CACHE_TTL_SECS", defaults.catalog_cache_ttl.as_secs())?;
        if cache_ttl_secs == 0 {
            anyhow::bail!("CATALOG_CACHE_TTL_SECS must be at least 1");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            default_currency,
            default_uncovered_percent,
            catalog_cache_ttl: Duration::from_secs(cache_ttl_secs),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.default_currency, "PEN");
        assert_eq!(config.default_uncovered_percent, Decimal::from(30));
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_from_env_validates_values() {
        env::set_var("CATALOG_CACHE_TTL_SECS", "0");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("CATALOG_CACHE_TTL_SECS"));

        env::set_var("CATALOG_CACHE_TTL_SECS", "soon");
        assert!(Config::from_env().is_err());

        env::set_var("CATALOG_CACHE_TTL_SECS", "60");
        let config = Config::from_env().unwrap();
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(60));

        env::remove_var("CATALOG_CACHE_TTL_SECS");
    }
}

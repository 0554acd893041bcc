//! Configuration management for the inventory ledger
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with LEDGER_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    pub max_connections: u32,

    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,

    /// Longest a workflow waits for a balance row lock, applied per
    /// transaction with `SET LOCAL lock_timeout`
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Falls back to the in-process cache when unset
    pub redis_url: Option<String>,

    pub ttl_secs: u64,
}

/// Tunables of the ledger workflows and reports
#[derive(Debug, Deserialize, Clone)]
pub struct LedgerSettings {
    /// Movements returned with an inventory status read
    pub recent_movements_limit: u32,

    /// Trailing window for average daily consumption
    pub consumption_window_days: u32,

    /// Multiplier on lead-time demand in reorder suggestions
    pub safety_factor: Decimal,

    /// Trailing window of an ABC pass
    pub abc_window_months: u32,

    /// Writer wait bound of the in-memory store
    pub lock_wait_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: None,
            ttl_secs: 300,
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            recent_movements_limit: 10,
            consumption_window_days: 30,
            safety_factor: shared::default_safety_factor(),
            abc_window_months: 12,
            lock_wait_ms: 5000,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("LEDGER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.lock_timeout_ms", 5000)?
            .set_default("cache.enabled", true)?
            .set_default("cache.ttl_secs", 300)?
            .set_default("ledger.recent_movements_limit", 10)?
            .set_default("ledger.consumption_window_days", 30)?
            .set_default("ledger.safety_factor", "1.2")?
            .set_default("ledger.abc_window_months", 12)?
            .set_default("ledger.lock_wait_ms", 5000)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (LEDGER__DATABASE__URL, ...)
            .add_source(
                Environment::with_prefix("LEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_defaults() {
        let settings = LedgerSettings::default();
        assert_eq!(settings.recent_movements_limit, 10);
        assert_eq!(settings.consumption_window_days, 30);
        assert_eq!(settings.safety_factor, Decimal::new(12, 1));
        assert_eq!(settings.abc_window_months, 12);
    }

    #[test]
    fn test_cache_defaults_to_five_minutes() {
        let cache = CacheConfig::default();
        assert!(cache.enabled);
        assert!(cache.redis_url.is_none());
        assert_eq!(cache.ttl_secs, 300);
    }
}

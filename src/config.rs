//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::cache::CacheService;

/// Which backing store the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Remote Redis-protocol store; disabled when no URL is set
    #[default]
    Redis,
    /// In-process store
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Backing store selection
    pub backend: StoreBackend,
    /// Remote store URL; absence disables caching and rate limiting
    pub redis_url: Option<String>,
    /// Remote store access token
    pub redis_token: Option<String>,
    /// Namespace prefix for every cache and rate-limit key
    pub cache_prefix: String,
    /// TTL in seconds for cache writes that do not pick one
    pub default_ttl: u64,
    /// In-memory store sweep interval in seconds
    pub cleanup_interval: u64,
    /// Bearer token allowed to create products
    pub admin_token: Option<String>,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &str) -> Option<T> {
    var(name).and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `STORE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `REDIS_URL` / `REDIS_TOKEN` - remote store credentials
    /// - `CACHE_PREFIX` - key namespace (default: "catalog:")
    /// - `CACHE_DEFAULT_TTL` - default TTL in seconds (default: 60)
    /// - `CLEANUP_INTERVAL` - memory store sweep frequency in seconds (default: 1)
    /// - `ADMIN_TOKEN` - bearer token for product writes (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parsed("SERVER_PORT").unwrap_or(defaults.server_port),
            backend: parsed("STORE_BACKEND").unwrap_or(defaults.backend),
            redis_url: var("REDIS_URL"),
            redis_token: var("REDIS_TOKEN"),
            cache_prefix: var("CACHE_PREFIX").unwrap_or(defaults.cache_prefix),
            default_ttl: parsed("CACHE_DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            cleanup_interval: parsed("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            admin_token: var("ADMIN_TOKEN"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            backend: StoreBackend::Redis,
            redis_url: None,
            redis_token: None,
            cache_prefix: CacheService::DEFAULT_PREFIX.to_string(),
            default_ttl: CacheService::DEFAULT_TTL,
            cleanup_interval: 1,
            admin_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.backend, StoreBackend::Redis);
        assert_eq!(config.cache_prefix, "catalog:");
        assert_eq!(config.default_ttl, 60);
        assert_eq!(config.cleanup_interval, 1);
        assert!(config.redis_url.is_none());
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "SERVER_PORT",
            "STORE_BACKEND",
            "REDIS_URL",
            "REDIS_TOKEN",
            "CACHE_PREFIX",
            "CACHE_DEFAULT_TTL",
            "CLEANUP_INTERVAL",
            "ADMIN_TOKEN",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.backend, StoreBackend::Redis);
        assert_eq!(config.default_ttl, 60);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!(" Redis ".parse::<StoreBackend>(), Ok(StoreBackend::Redis));
        assert!("memcached".parse::<StoreBackend>().is_err());
    }
}

//! API Configuration Module
//!
//! Bind address, CORS and cache backend selection. Configuration is loaded
//! from environment variables with defaults suited to local development.

use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// CACHE BACKEND SELECTION
// ============================================================================

/// Which cache backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackendKind {
    /// Process-local store. Nothing survives a restart.
    #[default]
    Memory,
    /// Shared Redis node (requires the `redis` feature).
    Redis,
}

impl FromStr for CacheBackendKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(CacheBackendKind::Memory),
            "redis" => Ok(CacheBackendKind::Redis),
            other => Err(ApiError::invalid_input(format!(
                "Unknown cache backend '{}', expected 'memory' or 'redis'",
                other
            ))),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind.
    pub bind_host: String,

    /// Port to bind.
    pub port: u16,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    pub cache_backend: CacheBackendKind,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(), // Empty = allow all
            cors_max_age_secs: 86400,
            cache_backend: CacheBackendKind::Memory,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STOREFRONT_API_BIND`: Host to bind (default: 0.0.0.0)
    /// - `PORT` or `STOREFRONT_API_PORT`: Port to bind (default: 3000)
    /// - `STOREFRONT_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `STOREFRONT_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `STOREFRONT_CACHE_BACKEND`: `memory` or `redis` (default: memory)
    ///
    /// Fails on an unparseable port or an unknown backend name.
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let bind_host = std::env::var("STOREFRONT_API_BIND").unwrap_or(defaults.bind_host);

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("STOREFRONT_API_PORT").ok())
        {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", raw)))?,
            None => defaults.port,
        };

        let cors_origins = std::env::var("STOREFRONT_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_max_age_secs = std::env::var("STOREFRONT_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let cache_backend = match std::env::var("STOREFRONT_CACHE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.cache_backend,
        };

        Ok(Self {
            bind_host,
            port,
            cors_origins,
            cors_max_age_secs,
            cache_backend,
        })
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.shop.example
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain
                        .strip_suffix(pattern)
                        .is_some_and(|sub| sub.ends_with('.'));
                }
            }
            false
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.port, 3000);
        assert_eq!(config.cache_backend, CacheBackendKind::Memory);
        assert_eq!(config.bind_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("Redis".parse::<CacheBackendKind>().unwrap(), CacheBackendKind::Redis);
        assert_eq!(" memory ".parse::<CacheBackendKind>().unwrap(), CacheBackendKind::Memory);
        assert!("memcached".parse::<CacheBackendKind>().is_err());
    }

    #[test]
    fn test_parse_origins_skips_blanks() {
        assert_eq!(
            parse_origins("https://a.example, ,https://b.example,"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_invalid_bind_host() {
        let config = ApiConfig {
            bind_host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_origin_allowed_dev_mode() {
        let config = ApiConfig::default();
        assert!(config.is_origin_allowed("https://anything.com"));
    }

    #[test]
    fn test_origin_allowed_production() {
        let config = ApiConfig {
            cors_origins: vec![
                "https://shop.example".to_string(),
                "*.shop.example".to_string(),
            ],
            ..Default::default()
        };

        assert!(config.is_origin_allowed("https://shop.example"));
        assert!(config.is_origin_allowed("https://admin.shop.example"));
        assert!(!config.is_origin_allowed("https://evil.com"));
        assert!(!config.is_origin_allowed("https://notshop.example"));
    }
}

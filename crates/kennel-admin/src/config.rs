//! # Admin Configuration
//!
//! Environment-based configuration for the cache admin service.

use std::env;
use std::net::SocketAddr;

use anyhow::Context;
use kennel_persistence::CacheConfig;

/// Admin server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub server_addr: SocketAddr,

    /// Logging level, used when `RUST_LOG` is unset
    pub log_level: String,

    /// Bearer token required by the clear-cache route. Unset disables it.
    pub admin_token: Option<String>,

    /// CORS allowed origins
    pub cors_origins: Vec<String>,

    /// Cache connection and keying
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Fails if `SERVER_ADDR` is set but not a socket address.
    pub fn from_env() -> anyhow::Result<Self> {
        let server_addr = env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("Invalid SERVER_ADDR")?;

        Ok(Self {
            server_addr,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            admin_token: env::var("ADMIN_TOKEN").ok().filter(|t| !t.trim().is_empty()),

            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),

            cache: CacheConfig::from_env(),
        })
    }
}

//! Cache configuration.

use std::env;
use std::time::Duration;

use super::keys::Shape;

/// Default lifetime of every cached shape
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache TTL configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub single: Duration,
    pub page: Duration,
    pub filtered: Duration,
}

impl CacheTtl {
    /// Same lifetime for every shape.
    #[must_use]
    pub fn uniform(ttl: Duration) -> Self {
        Self {
            single: ttl,
            page: ttl,
            filtered: ttl,
        }
    }

    pub fn for_shape(&self, shape: Shape) -> Duration {
        match shape {
            Shape::Single => self.single,
            Shape::Page => self.page,
            Shape::Filtered => self.filtered,
        }
    }
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self::uniform(DEFAULT_TTL)
    }
}

/// Cache layer configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis connection URL
    pub url: String,
    /// Deployment tag appended to every key
    pub environment: String,
    pub ttl: CacheTtl,
    /// When false, reads bypass the cache. Writes still invalidate.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            environment: "development".to_string(),
            ttl: CacheTtl::default(),
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Load from `REDIS_URL`, `CACHE_ENV`, `CACHE_TTL_SECS` and
    /// `CACHE_ENABLED`, falling back to defaults for unset or unparsable
    /// values.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            url: env::var("REDIS_URL").unwrap_or(defaults.url),
            environment: env::var("CACHE_ENV").unwrap_or(defaults.environment),
            ttl: env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map_or(defaults.ttl, |secs| {
                    CacheTtl::uniform(Duration::from_secs(secs))
                }),
            enabled: env::var("CACHE_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.enabled),
        }
    }

    /// The connection URL with any credentials masked, for logging.
    ///
    /// `redis://:pw@host:6379/0` becomes `redis://***@host:6379/0`.
    #[must_use]
    pub fn redacted_url(&self) -> String {
        let (scheme, rest) = match self.url.split_once("://") {
            Some((scheme, rest)) => (Some(scheme), rest),
            None => (None, self.url.as_str()),
        };
        let authority_end = rest.find('/').unwrap_or(rest.len());
        let (authority, path) = rest.split_at(authority_end);

        let host = match authority.rfind('@') {
            Some(at) => format!("***@{}", &authority[at + 1..]),
            None => authority.to_string(),
        };

        match scheme {
            Some(scheme) => format!("{scheme}://{host}{path}"),
            None => format!("{host}{path}"),
        }
    }
}

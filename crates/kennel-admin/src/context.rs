//! # Admin Context
//!
//! Shared state injected into every handler.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use kennel_persistence::CacheAdmin;
use subtle::ConstantTimeEq;

use crate::error::AdminError;

/// Application state for Axum handlers
#[derive(Clone)]
pub struct AppState {
    pub admin: CacheAdmin,
    admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(admin: CacheAdmin, admin_token: Option<String>) -> Self {
        Self {
            admin,
            admin_token: admin_token.map(Arc::from),
        }
    }

    /// Check `Authorization: Bearer <token>`. Without a configured token
    /// every request is refused. The token must match byte for byte and is
    /// compared in constant time.
    ///
    /// # Errors
    ///
    /// [`AdminError::Unauthorized`] on a missing, malformed or wrong token.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), AdminError> {
        let Some(expected) = self.admin_token.as_deref() else {
            return Err(AdminError::Unauthorized("admin token not configured"));
        };

        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AdminError::Unauthorized("missing bearer token"))?;

        if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(())
        } else {
            Err(AdminError::Unauthorized("invalid bearer token"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use kennel_persistence::{CacheConfig, CacheLayer, MemoryCacheClient};

    fn state(token: Option<&str>) -> AppState {
        let layer =
            CacheLayer::new(Arc::new(MemoryCacheClient::new()), &CacheConfig::default()).unwrap();
        AppState::new(layer.admin(), token.map(String::from))
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_authorize_exact_token() {
        let state = state(Some("s3cret"));
        assert!(state.authorize(&bearer("Bearer s3cret")).is_ok());
    }

    #[test]
    fn test_authorize_rejects_near_misses() {
        let state = state(Some("s3cret"));
        for value in [
            "Bearer s3cret ",
            "Bearer  s3cret",
            "Bearer s3cre",
            "Bearer s3cretx",
            "Bearer S3CRET",
            "bearer s3cret",
        ] {
            assert!(
                matches!(state.authorize(&bearer(value)), Err(AdminError::Unauthorized(_))),
                "accepted {value:?}"
            );
        }
    }

    #[test]
    fn test_authorize_without_configured_token() {
        let state = state(None);
        assert!(matches!(
            state.authorize(&bearer("Bearer ")),
            Err(AdminError::Unauthorized("admin token not configured"))
        ));
    }
}

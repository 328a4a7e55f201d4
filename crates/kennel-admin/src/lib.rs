//! # Kennel Cache Admin
//!
//! Operator-facing HTTP surface for the catalog cache.
//!
//! ## Routes
//!
//! - `GET /health` - service status and cache reachability
//! - `POST /admin/cache/clear` - flush the whole cache (bearer token)
//!
//! The flush exists for manual recovery, e.g. after a bulk data migration.
//! Nothing calls it automatically.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Axum HTTP Server                         │
//! │            (TraceLayer, CORS, bearer-token check)           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CacheAdmin                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Redis (CacheClient)                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod error;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use context::AppState;
pub use error::{AdminError, AdminResult};

/// Health check body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_backend: &'static str,
    pub cache_reachable: bool,
}

/// Operator action acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check endpoint. Always 200; a dead cache degrades, not fails.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.admin.health().await;
    Json(HealthResponse {
        status: if health.reachable { "ok" } else { "degraded" },
        cache_backend: health.backend,
        cache_reachable: health.reachable,
    })
}

/// Flush every cache entry
///
/// # Errors
///
/// 401 without a valid bearer token, 503 if the cache backend is down.
pub async fn clear_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AdminResult<Json<MessageResponse>> {
    if let Err(e) = state.authorize(&headers) {
        tracing::warn!(error = %e, "Rejected cache clear");
        return Err(e);
    }

    state.admin.clear_all().await?;

    Ok(Json(MessageResponse {
        message: "Cache cleared successfully".to_string(),
    }))
}

/// Build the Axum router
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let origins = if cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            cors_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(origins)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/admin/cache/clear", post(clear_cache))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

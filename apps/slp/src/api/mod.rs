//! # Ledger HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Ledger metrics
//! - `POST /concepts` - Submit a concept
//! - `GET /concepts/{id}` - Look up a concept
//! - `GET /lineage/{id}` - Lineage chain of a concept
//! - `GET /export` - Base64 snapshot of the ledger
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `SLP_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `SLP_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `SLP_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{API_KEY_ENV, ApiKey};
pub use handlers::{
    concept_handler, export_handler, health_handler, lineage_handler, status_for_error,
    status_handler, submit_handler,
};
pub use middleware::{GlobalRateLimiter, RATE_LIMIT_ENV, create_rate_limiter, rate_limit_from_env};
pub use types::{
    ConceptJson, ConceptResponse, ExportResponse, HealthResponse, LineageEntry, LineageResponse,
    StatusResponse, SubmitRequest, SubmitResponse,
};

use crate::config::LedgerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use slp_core::{CoreParams, Embedder, Ledger, SlpError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable holding allowed CORS origins.
pub const CORS_ORIGINS_ENV: &str = "SLP_CORS_ORIGINS";

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// `ledger` is the single writer lock: submissions take it for writing,
/// everything else for reading.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub embedder: Arc<dyn Embedder>,
    pub params: Arc<CoreParams>,
}

impl AppState {
    /// Create new app state.
    pub fn new(ledger: Ledger, embedder: Arc<dyn Embedder>, params: CoreParams) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            embedder,
            params: Arc::new(params),
        }
    }

    /// Create app state with the backend and params from a config.
    pub fn from_config(ledger: Ledger, config: &LedgerConfig) -> Result<Self, SlpError> {
        let embedder = config.build_embedder()?;
        Ok(Self::new(ledger, Arc::new(embedder), config.params.clone()))
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from `SLP_CORS_ORIGINS`.
///
/// - `*`: all origins
/// - unset: localhost only
/// - otherwise: comma-separated list of origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var(CORS_ORIGINS_ENV).ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins ({}=*)", CORS_ORIGINS_ENV);
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!(origin = trimmed, "CORS: Allowing origin");
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!(origin = trimmed, error = %e, "CORS: Invalid origin");
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => build_localhost_cors(),
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. CORS
/// 3. Rate limiting (if enabled)
/// 4. Authentication (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limiter = match rate_limit_from_env() {
        Some(rps) => {
            tracing::info!(requests_per_second = rps.get(), "Rate limiting enabled");
            Some(create_rate_limiter(rps))
        }
        None => {
            tracing::info!("Rate limiting disabled");
            None
        }
    };

    let api_key = ApiKey::from_env();
    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED. Set {} to require a key.",
            API_KEY_ENV
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/concepts", post(handlers::submit_handler))
        .route("/concepts/{id}", get(handlers::concept_handler))
        .route("/lineage/{id}", get(handlers::lineage_handler))
        .route("/export", get(handlers::export_handler));

    if let Some(key) = api_key {
        router = router.layer(axum_middleware::from_fn_with_state(
            key,
            auth::require_api_key,
        ));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), SlpError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SlpError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!(addr, "Ledger HTTP server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| SlpError::IoError(format!("Server error: {}", e)))
}

//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints, plus the
//! fixed-window rate-limit middleware that fronts them.

use axum::{
    extract::{Path, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
    Json,
};
use tracing::info;

use crate::cache::{CacheService, CacheStatsReport, RateLimitDecision};
use crate::config::CacheConfig;
use crate::error::{ApiError, Result};
use crate::models::{ClearResponse, HealthResponse, InvalidateResponse, RateLimitCheckRequest};

/// Client identity used when no forwarding header is present.
const ANONYMOUS_CLIENT: &str = "anonymous";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache facade
    pub cache: CacheService,
    /// Admin requests allowed per window per client
    pub admin_limit: u64,
    /// Admin window length in seconds
    pub admin_window: u64,
}

impl AppState {
    /// Creates a new AppState with the given cache service and admin quota.
    pub fn new(cache: CacheService, admin_limit: u64, admin_window: u64) -> Self {
        Self {
            cache,
            admin_limit,
            admin_window,
        }
    }

    /// Creates a new AppState using the admin quota from the Config.
    pub fn from_config(cache: CacheService, config: &CacheConfig) -> Self {
        Self::new(cache, config.admin_rate_limit, config.admin_rate_window)
    }
}

/// First address in `x-forwarded-for`, or [`ANONYMOUS_CLIENT`].
fn client_id(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string()
}

/// Middleware enforcing the admin quota per client.
///
/// Fails open with the limiter: when the cache tier is down every request passes.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let key = format!("ratelimit:admin:{}", client_id(request.headers()));
    let decision = state
        .cache
        .check_rate_limit(&key, state.admin_limit, state.admin_window)
        .await;

    if !decision.allowed {
        return Err(ApiError::RateLimited {
            retry_after: decision.reset_in.unwrap_or(state.admin_window),
        });
    }
    Ok(next.run(request).await)
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.connector().status()))
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStatsReport> {
    Json(state.cache.get_cache_stats().await)
}

/// Handler for DELETE /cache
///
/// Flushes every key in the store.
pub async fn clear_cache_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    if !state.cache.clear_all_cache().await {
        return Err(ApiError::Unavailable("cache flush did not complete".to_string()));
    }
    info!("Cache cleared through admin API");
    Ok(Json(ClearResponse::cleared()))
}

/// Handler for DELETE /cache/users/:user_id
pub async fn invalidate_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    if user_id.trim().is_empty() {
        return Err(ApiError::InvalidRequest("User id cannot be empty".to_string()));
    }
    if !state.cache.invalidate_user_cache(&user_id).await {
        return Err(ApiError::Unavailable(format!(
            "could not invalidate cache for user '{}'",
            user_id
        )));
    }
    Ok(Json(InvalidateResponse::new(user_id)))
}

/// Handler for POST /rate-limit/check
pub async fn rate_limit_check_handler(
    State(state): State<AppState>,
    Json(req): Json<RateLimitCheckRequest>,
) -> Result<Json<RateLimitDecision>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let decision = state
        .cache
        .check_rate_limit(&req.key, req.limit, req.window)
        .await;
    Ok(Json(decision))
}

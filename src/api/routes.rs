//! API Routes
//!
//! Configures the Axum router with the cache admin endpoints.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_cache_handler, health_handler, invalidate_user_handler, rate_limit_check_handler,
    rate_limit_middleware, stats_handler, AppState,
};

/// Creates the admin router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Process health and cache connection status
/// - `GET /cache/stats` - Store figures and cache counters
/// - `DELETE /cache` - Flush the whole store
/// - `DELETE /cache/users/:user_id` - Drop one user's cached entries
/// - `POST /rate-limit/check` - Count one hit against a rate-limit key
///
/// # Middleware
/// - Rate limit: fixed-window quota per client on every route except
///   `/health`, fails open
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin = Router::new()
        .route("/cache/stats", get(stats_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/cache/users/:user_id", delete(invalidate_user_handler))
        .route("/rate-limit/check", post(rate_limit_check_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

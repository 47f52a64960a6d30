//! API Module
//!
//! HTTP handlers and routing for the cache admin API.
//!
//! # Endpoints
//! - `GET /health` - Health check with cache connection status
//! - `GET /cache/stats` - Cache statistics
//! - `DELETE /cache` - Flush the store
//! - `DELETE /cache/users/:user_id` - Invalidate one user's entries
//! - `POST /rate-limit/check` - Fixed-window rate-limit check

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

//! Prep Cache - failure-tolerant cache-aside layer for the exam-prep backend
//!
//! Fronts the document database with Redis: typed per-family caching of
//! limits, profiles, subscriptions, question banks and analytics, fixed-window
//! rate limiting, and admin operations. Every store call is time-bounded and
//! degrades to a miss, so callers never handle cache errors.

pub mod api;
pub mod cache;
pub mod config;
pub mod connector;
pub mod error;
pub mod models;
pub mod store;

pub use api::AppState;
pub use cache::{CacheService, QuestionListQuery, RateLimitDecision};
pub use config::CacheConfig;
pub use connector::{ConnectionStatus, StoreConnector};

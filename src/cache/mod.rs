//! Cache Module
//!
//! Cache-aside facade over the key-value store: typed per-family reads and
//! writes, fixed-window rate limiting, and admin operations, all funnelled
//! through one timeout-guarded runner.

mod admin;
mod guard;
pub mod keys;
mod rate_limit;
mod service;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use admin::CacheStatsReport;
pub use guard::OperationGuard;
pub use keys::{KeyFamily, QuestionListQuery};
pub use rate_limit::RateLimitDecision;
pub use service::CacheService;
pub use stats::{CacheMetrics, CacheStats};

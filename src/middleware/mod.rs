//! HTTP Middleware Module
//!
//! Request pipeline pieces applied in front of the handlers:
//!
//! ```text
//! request → rate limiter → response cache → handler
//!                               ↑
//!           mutation invalidation (global, after the handler)
//! ```

pub mod invalidation;
pub mod rate_limit;
pub mod response_cache;

pub use invalidation::invalidate_on_mutation;
pub use rate_limit::{
    RateLimitError, RateLimitPolicy, RateLimitStatus, RateLimiter, RateLimiters,
};
pub use response_cache::{cache_response, CachedResponse, ResponseCache, X_CACHE, X_CACHE_KEY};

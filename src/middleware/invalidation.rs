//! Mutation Invalidation Middleware
//!
//! After any `POST`, `PUT`, `PATCH` or `DELETE` the cached `GET` variants of
//! the touched resource are evicted. Matching is by whole path segments: the
//! cached path is the mutated path, lies below it, or lies above it. Query
//! strings are ignored, so every variant of a path goes at once.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::middleware::response_cache::ResponseCache;

pub fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Path portion of a cache key: method prefix and query string removed.
///
/// `GET:/users/1?fields=name` becomes `/users/1`.
pub fn key_path(key: &str) -> &str {
    let target = match key.split_once(':') {
        Some((method, rest))
            if !method.is_empty() && method.bytes().all(|b| b.is_ascii_uppercase()) =>
        {
            rest
        }
        _ => key,
    };

    target.split(['?', '#']).next().unwrap_or(target)
}

/// True when one path is a segment-wise prefix of the other.
///
/// `/users` overlaps `/users/1`, but `/users/1` does not overlap `/users/123`.
pub fn paths_overlap(a: &str, b: &str) -> bool {
    let mut a = a.split('/').filter(|s| !s.is_empty());
    let mut b = b.split('/').filter(|s| !s.is_empty());

    loop {
        match (a.next(), b.next()) {
            (Some(x), Some(y)) if x == y => continue,
            (Some(_), Some(_)) => return false,
            _ => return true,
        }
    }
}

// == Middleware ==
/// Runs the handler, then evicts cache entries for the mutated path.
///
/// Eviction happens regardless of the handler outcome.
pub async fn invalidate_on_mutation(
    State(cache): State<ResponseCache>,
    req: Request,
    next: Next,
) -> Response {
    if !is_mutating(req.method()) {
        return next.run(req).await;
    }

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    let removed = cache.invalidate_path(&path).await;
    if removed > 0 {
        debug!(%method, path = %path, removed, "Invalidated cached responses");
    }

    response
}

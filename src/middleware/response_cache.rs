//! Response Cache Middleware
//!
//! Memoizes successful `GET` responses in a [`TtlCache`] keyed by method,
//! path and query string. Hits short-circuit the handler chain.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::cache::{CacheStats, TtlCache};
use crate::middleware::invalidation::{key_path, paths_overlap};

/// Header carrying `HIT` or `MISS`.
pub const X_CACHE: &str = "x-cache";
/// Header carrying the cache key used for the lookup.
pub const X_CACHE_KEY: &str = "x-cache-key";

/// Derives a cache key from a request.
pub type KeyFn = Arc<dyn Fn(&Request) -> String + Send + Sync>;

// == Cached Response ==
/// Replayable snapshot of a successful response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut response = (status, Body::from(self.body)).into_response();
        if let Some(content_type) = self.content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}

// == Response Cache ==
/// Shared handle to the response cache and its settings.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<RwLock<TtlCache<CachedResponse>>>,
    ttl: Duration,
    max_body_bytes: usize,
    key_fn: Option<KeyFn>,
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("custom_key", &self.key_fn.is_some())
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    /// Creates a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: Arc::new(RwLock::new(TtlCache::new(ttl))),
            ttl,
            max_body_bytes: 1024 * 1024,
            key_fn: None,
        }
    }

    /// Creates the cache from server configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(Duration::from_secs(config.cache_ttl))
            .with_max_body_bytes(config.cache_max_body_bytes)
    }

    /// Replaces the default `METHOD:path?query` key derivation.
    pub fn with_key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(key_fn));
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Computes the key a request is cached under.
    pub fn cache_key(&self, req: &Request) -> String {
        match &self.key_fn {
            Some(key_fn) => key_fn(req),
            None => default_cache_key(req),
        }
    }

    pub async fn get(&self, key: &str) -> Option<CachedResponse> {
        self.store.write().await.get(key)
    }

    pub async fn put(&self, key: String, response: CachedResponse) {
        self.store.write().await.set(key, response, self.ttl);
    }

    /// Evicts every entry whose key path overlaps `path` by whole segments.
    pub async fn invalidate_path(&self, path: &str) -> usize {
        self.store
            .write()
            .await
            .remove_where(|key| paths_overlap(key_path(key), path))
    }

    pub async fn purge_expired(&self) -> usize {
        self.store.write().await.purge_expired()
    }

    pub async fn clear(&self) -> usize {
        self.store.write().await.clear()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

/// `METHOD:path?query`, e.g. `GET:/api/items?page=2`.
pub fn default_cache_key(req: &Request) -> String {
    let uri = req.uri();
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    format!("{}:{}", req.method(), target)
}

// == Middleware ==
/// Serves `GET` requests from the cache and records successful misses.
///
/// Other methods pass through untouched.
pub async fn cache_response(
    State(cache): State<ResponseCache>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let key = cache.cache_key(&req);

    if let Some(cached) = cache.get(&key).await {
        debug!(key = %key, "Response cache hit");
        return with_cache_headers(cached.into_response(), "HIT", &key);
    }

    let response = next.run(req).await;
    if !response.status().is_success() {
        return with_cache_headers(response, "MISS", &key);
    }

    let (parts, body) = response.into_parts();

    // Streaming or oversized bodies are served without being cached
    let fits = body
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= cache.max_body_bytes as u64);
    if !fits {
        let response = Response::from_parts(parts, body);
        return with_cache_headers(response, "MISS", &key);
    }

    let bytes = match axum::body::to_bytes(body, cache.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(key = %key, error = %err, "Failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    cache
        .put(
            key.clone(),
            CachedResponse {
                status: parts.status.as_u16(),
                content_type: parts.headers.get(header::CONTENT_TYPE).cloned(),
                body: bytes.clone(),
            },
        )
        .await;
    debug!(key = %key, ttl_secs = cache.ttl.as_secs(), "Response cached");

    let response = Response::from_parts(parts, Body::from(bytes));
    with_cache_headers(response, "MISS", &key)
}

fn with_cache_headers(mut response: Response, outcome: &'static str, key: &str) -> Response {
    let headers = response.headers_mut();
    headers.insert(X_CACHE, HeaderValue::from_static(outcome));
    if let Ok(value) = HeaderValue::from_str(key) {
        headers.insert(X_CACHE_KEY, value);
    }
    response
}

//! Rate Limiting Middleware
//!
//! Fixed-window request counters per client identity, with four named
//! policies of different blast radius.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::warn;

use crate::models::RateLimitResponse;

const FIFTEEN_MINUTES: Duration = Duration::from_secs(15 * 60);
const ONE_HOUR: Duration = Duration::from_secs(60 * 60);

/// Identity used when neither a forwarded address nor a peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// One reverse proxy in front of the server.
pub const DEFAULT_TRUSTED_PROXY_HOPS: usize = 1;

const RATELIMIT_LIMIT: &str = "ratelimit-limit";
const RATELIMIT_REMAINING: &str = "ratelimit-remaining";
const RATELIMIT_RESET: &str = "ratelimit-reset";

// == Policy ==
/// Request budget for one tier of endpoints.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub name: String,
    pub window: Duration,
    /// Requests allowed per client per window
    pub max: u32,
    /// Only responses with status >= 400 consume budget
    pub skip_successful_requests: bool,
    /// Exact paths never subject to this policy
    pub skip_paths: Vec<String>,
    pub message: String,
    /// Human-readable retry hint returned to rejected clients
    pub retry_after: String,
}

impl RateLimitPolicy {
    /// 100 requests per 15 minutes; health checks exempt.
    pub fn general() -> Self {
        Self {
            name: "general".to_string(),
            window: FIFTEEN_MINUTES,
            max: 100,
            skip_successful_requests: false,
            skip_paths: vec!["/health".to_string(), "/api/health".to_string()],
            message: "Too many requests from this IP, please try again later.".to_string(),
            retry_after: "15 minutes".to_string(),
        }
    }

    /// 10 requests per 15 minutes for sensitive endpoints.
    pub fn strict() -> Self {
        Self {
            name: "strict".to_string(),
            window: FIFTEEN_MINUTES,
            max: 10,
            skip_successful_requests: false,
            skip_paths: Vec::new(),
            message: "Too many requests to this sensitive endpoint.".to_string(),
            retry_after: "15 minutes".to_string(),
        }
    }

    /// 5 failed attempts per 15 minutes; successful logins are free.
    pub fn auth() -> Self {
        Self {
            name: "auth".to_string(),
            window: FIFTEEN_MINUTES,
            max: 5,
            skip_successful_requests: true,
            skip_paths: Vec::new(),
            message: "Too many authentication attempts, please try again later.".to_string(),
            retry_after: "15 minutes".to_string(),
        }
    }

    /// 10 payment attempts per hour.
    pub fn payment() -> Self {
        Self {
            name: "payment".to_string(),
            window: ONE_HOUR,
            max: 10,
            skip_successful_requests: false,
            skip_paths: Vec::new(),
            message: "Too many payment attempts, please try again later.".to_string(),
            retry_after: "1 hour".to_string(),
        }
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.skip_paths.iter().any(|skip| skip == path)
    }
}

// == Errors ==
#[derive(Error, Debug, Clone)]
pub enum RateLimitError {
    #[error("{message}")]
    Exceeded {
        policy: String,
        message: String,
        retry_after: String,
        reset_after: Duration,
    },
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let RateLimitError::Exceeded {
            message,
            retry_after,
            reset_after,
            ..
        } = self;

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitResponse::new(message, retry_after)),
        )
            .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(ceil_secs(reset_after)));
        response
    }
}

// == Status ==
/// Budget left after a counted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    started_at: Instant,
    count: u32,
}

// == Rate Limiter ==
/// Shared per-client counters for one policy.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    policy: Arc<RateLimitPolicy>,
    clients: Arc<RwLock<HashMap<String, WindowCounter>>>,
    trusted_proxy_hops: usize,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            clients: Arc::new(RwLock::new(HashMap::new())),
            trusted_proxy_hops: DEFAULT_TRUSTED_PROXY_HOPS,
        }
    }

    /// Sets how many proxies in front of the server append to
    /// `X-Forwarded-For`. See [`client_identity`].
    pub fn with_trusted_proxy_hops(mut self, hops: usize) -> Self {
        self.trusted_proxy_hops = hops;
        self
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn trusted_proxy_hops(&self) -> usize {
        self.trusted_proxy_hops
    }

    /// Counts one request for `client`.
    ///
    /// Rejected requests do not consume budget.
    pub async fn hit(&self, client: &str) -> Result<RateLimitStatus, RateLimitError> {
        let now = Instant::now();
        let window = self.policy.window;
        let mut clients = self.clients.write().await;

        let counter = clients
            .entry(client.to_string())
            .or_insert(WindowCounter {
                started_at: now,
                count: 0,
            });

        if now.duration_since(counter.started_at) >= window {
            counter.started_at = now;
            counter.count = 0;
        }

        let reset_after = window.saturating_sub(now.duration_since(counter.started_at));

        if counter.count >= self.policy.max {
            warn!(
                policy = %self.policy.name,
                client = %client,
                limit = self.policy.max,
                "Rate limit exceeded"
            );
            return Err(RateLimitError::Exceeded {
                policy: self.policy.name.clone(),
                message: self.policy.message.clone(),
                retry_after: self.policy.retry_after.clone(),
                reset_after,
            });
        }

        counter.count += 1;

        Ok(RateLimitStatus {
            limit: self.policy.max,
            remaining: self.policy.max - counter.count,
            reset_after,
        })
    }

    /// Gives back one unit of budget counted in the current window.
    pub async fn refund(&self, client: &str) {
        let now = Instant::now();
        let mut clients = self.clients.write().await;

        if let Some(counter) = clients.get_mut(client) {
            if now.duration_since(counter.started_at) < self.policy.window {
                counter.count = counter.count.saturating_sub(1);
            }
        }
    }

    /// Drops counters whose window has closed. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let window = self.policy.window;
        let mut clients = self.clients.write().await;

        let before = clients.len();
        clients.retain(|_, counter| now.duration_since(counter.started_at) < window);
        before - clients.len()
    }

    pub async fn tracked_clients(&self) -> usize {
        self.clients.read().await.len()
    }
}

// == Policy Set ==
/// The four limiters applied at the HTTP layer.
#[derive(Debug, Clone)]
pub struct RateLimiters {
    pub general: RateLimiter,
    pub strict: RateLimiter,
    pub auth: RateLimiter,
    pub payment: RateLimiter,
}

impl RateLimiters {
    pub fn standard() -> Self {
        Self {
            general: RateLimiter::new(RateLimitPolicy::general()),
            strict: RateLimiter::new(RateLimitPolicy::strict()),
            auth: RateLimiter::new(RateLimitPolicy::auth()),
            payment: RateLimiter::new(RateLimitPolicy::payment()),
        }
    }

    /// Standard policies, identifying clients behind `config.trusted_proxy_hops` proxies.
    pub fn from_config(config: &crate::config::Config) -> Self {
        let hops = config.trusted_proxy_hops;
        Self {
            general: RateLimiter::new(RateLimitPolicy::general()).with_trusted_proxy_hops(hops),
            strict: RateLimiter::new(RateLimitPolicy::strict()).with_trusted_proxy_hops(hops),
            auth: RateLimiter::new(RateLimitPolicy::auth()).with_trusted_proxy_hops(hops),
            payment: RateLimiter::new(RateLimitPolicy::payment()).with_trusted_proxy_hops(hops),
        }
    }

    pub fn all(&self) -> [&RateLimiter; 4] {
        [&self.general, &self.strict, &self.auth, &self.payment]
    }
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::standard()
    }
}

/// Client identity as seen through `trusted_proxy_hops` reverse proxies.
///
/// Each trusted proxy appends the address it received the request from, so
/// the client is the entry `trusted_proxy_hops` places from the right of
/// `X-Forwarded-For`. Entries further left are client-supplied and ignored.
/// With no trusted proxies, or no forwarded header, the peer address is used.
pub fn client_identity(req: &Request, trusted_proxy_hops: usize) -> String {
    if trusted_proxy_hops > 0 {
        let hops: Vec<&str> = req
            .headers()
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .collect();

        if let Some(ip) = hops.get(hops.len().saturating_sub(trusted_proxy_hops)) {
            return ip.to_string();
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

// == Middleware ==
/// Rejects the request with 429 once the client's budget is spent.
pub async fn enforce(State(limiter): State<RateLimiter>, req: Request, next: Next) -> Response {
    if limiter.policy.is_exempt(req.uri().path()) {
        return next.run(req).await;
    }

    let client = client_identity(&req, limiter.trusted_proxy_hops);
    let status = match limiter.hit(&client).await {
        Ok(status) => status,
        Err(err) => return err.into_response(),
    };

    let mut response = next.run(req).await;

    let mut remaining = status.remaining;
    if limiter.policy.skip_successful_requests && response.status().as_u16() < 400 {
        limiter.refund(&client).await;
        remaining += 1;
    }

    let headers = response.headers_mut();
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(status.limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(
        RATELIMIT_RESET,
        HeaderValue::from(ceil_secs(status.reset_after)),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn_with_state, routing::get, Router};
    use tower::util::ServiceExt;

    fn tiny_policy(max: u32) -> RateLimitPolicy {
        RateLimitPolicy {
            name: "tiny".to_string(),
            window: Duration::from_secs(60),
            max,
            skip_successful_requests: false,
            skip_paths: vec!["/health".to_string()],
            message: "slow down".to_string(),
            retry_after: "1 minute".to_string(),
        }
    }

    #[test]
    fn test_presets() {
        let general = RateLimitPolicy::general();
        assert_eq!(general.max, 100);
        assert_eq!(general.window, FIFTEEN_MINUTES);
        assert!(general.is_exempt("/health"));
        assert!(general.is_exempt("/api/health"));
        assert!(!general.is_exempt("/api/items"));

        assert_eq!(RateLimitPolicy::strict().max, 10);

        let auth = RateLimitPolicy::auth();
        assert_eq!(auth.max, 5);
        assert!(auth.skip_successful_requests);

        let payment = RateLimitPolicy::payment();
        assert_eq!(payment.max, 10);
        assert_eq!(payment.window, ONE_HOUR);
    }

    #[tokio::test]
    async fn test_hit_counts_down() {
        let limiter = RateLimiter::new(tiny_policy(3));

        assert_eq!(limiter.hit("a").await.unwrap().remaining, 2);
        assert_eq!(limiter.hit("a").await.unwrap().remaining, 1);
        assert_eq!(limiter.hit("a").await.unwrap().remaining, 0);
        assert!(limiter.hit("a").await.is_err());

        // Other clients have their own budget
        assert!(limiter.hit("b").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets() {
        let limiter = RateLimiter::new(tiny_policy(1));

        limiter.hit("a").await.unwrap();
        assert!(limiter.hit("a").await.is_err());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.hit("a").await.is_ok());
    }

    #[tokio::test]
    async fn test_refund() {
        let limiter = RateLimiter::new(tiny_policy(1));

        limiter.hit("a").await.unwrap();
        limiter.refund("a").await;
        assert!(limiter.hit("a").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let limiter = RateLimiter::new(tiny_policy(5));
        limiter.hit("a").await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.hit("b").await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;

        assert_eq!(limiter.purge_expired().await, 1);
        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[test]
    fn test_client_identity() {
        let forwarded = || {
            Request::builder()
                .uri("/")
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
                .body(Body::empty())
                .unwrap()
        };
        assert_eq!(client_identity(&forwarded(), 1), "10.0.0.1");
        assert_eq!(client_identity(&forwarded(), 2), "203.0.113.7");
        // Fewer entries than trusted hops: leftmost is the best guess
        assert_eq!(client_identity(&forwarded(), 5), "203.0.113.7");

        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_identity(&req, 1), UNKNOWN_CLIENT);

        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(client_identity(&req, 1), "192.0.2.1");
    }

    #[test]
    fn test_client_identity_without_trusted_proxy() {
        let mut req = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));

        assert_eq!(client_identity(&req, 0), "192.0.2.1");
    }

    #[test]
    fn test_client_identity_across_forwarded_headers() {
        let req = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "198.51.100.9")
            .header("x-forwarded-for", "10.0.0.1, 10.0.0.2")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_identity(&req, 1), "10.0.0.2");
        assert_eq!(client_identity(&req, 3), "198.51.100.9");
    }

    #[tokio::test]
    async fn test_rotating_leading_hops_share_budget() {
        let limiter = RateLimiter::new(RateLimitPolicy::auth());
        let app = Router::new()
            .route("/login", axum::routing::post(|| async { StatusCode::UNAUTHORIZED }))
            .layer(from_fn_with_state(limiter, enforce));

        let mut rejected = 0;
        for i in 0..50 {
            let req = Request::builder()
                .method("POST")
                .uri("/login")
                .header("x-forwarded-for", format!("10.9.0.{i}, 198.51.100.7"))
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(req).await.unwrap();
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                rejected += 1;
            }
        }

        assert_eq!(rejected, 45);
    }

    #[test]
    fn test_from_config_applies_proxy_hops() {
        let config = crate::config::Config {
            trusted_proxy_hops: 2,
            ..Default::default()
        };
        let limiters = RateLimiters::from_config(&config);

        for limiter in limiters.all() {
            assert_eq!(limiter.trusted_proxy_hops(), 2);
        }
        assert_eq!(
            RateLimiter::new(tiny_policy(1)).trusted_proxy_hops(),
            DEFAULT_TRUSTED_PROXY_HOPS
        );
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::from_millis(1500)), 2);
        assert_eq!(ceil_secs(Duration::from_secs(3)), 3);
        assert_eq!(ceil_secs(Duration::ZERO), 0);
    }

    #[tokio::test]
    async fn test_middleware_rejects_with_429() {
        let limiter = RateLimiter::new(tiny_policy(1));
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route("/health", get(|| async { "ok" }))
            .layer(from_fn_with_state(limiter, enforce));

        let ping = || Request::builder().uri("/ping").body(Body::empty()).unwrap();

        let first = app.clone().oneshot(ping()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["ratelimit-limit"], "1");
        assert_eq!(first.headers()["ratelimit-remaining"], "0");

        let second = app.clone().oneshot(ping()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(header::RETRY_AFTER));

        let bytes = axum::body::to_bytes(second.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "slow down");
        assert_eq!(json["retryAfter"], "1 minute");

        // Health checks are never limited
        for _ in 0..3 {
            let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
            let response = app.clone().oneshot(health).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_skip_successful_requests() {
        let policy = RateLimitPolicy {
            skip_successful_requests: true,
            ..tiny_policy(2)
        };
        let limiter = RateLimiter::new(policy);
        let app = Router::new()
            .route("/ok", get(|| async { StatusCode::OK }))
            .route("/fail", get(|| async { StatusCode::UNAUTHORIZED }))
            .layer(from_fn_with_state(limiter, enforce));

        let call = |uri: &'static str| Request::builder().uri(uri).body(Body::empty()).unwrap();

        for _ in 0..5 {
            let response = app.clone().oneshot(call("/ok")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        for _ in 0..2 {
            let response = app.clone().oneshot(call("/fail")).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let blocked = app.oneshot(call("/ok")).await.unwrap();
        assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}

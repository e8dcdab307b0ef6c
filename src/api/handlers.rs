//! API Handlers
//!
//! HTTP request handlers for each edge service endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{AppError, Result};
use crate::middleware::{RateLimiters, ResponseCache};
use crate::models::{
    CacheStatsResponse, ClearCacheResponse, CreateItemRequest, DeleteResponse, DequeueResponse,
    EnqueueResponse, HealthResponse, ItemListResponse, ListItemsQuery, QueueListResponse,
    QueueSizeResponse,
};
use crate::queue::{QueueRegistry, JOBS_QUEUE};
use crate::repository::{Item, ItemRepository};
use crate::retry::RetryPolicy;

/// Default page size for item listings.
const DEFAULT_PAGE_SIZE: usize = 50;
/// Largest page a client may request.
const MAX_PAGE_SIZE: usize = 100;

/// Application state shared across all handlers.
///
/// Built once at startup and handed to the router; nothing here is global.
#[derive(Clone)]
pub struct AppState {
    /// Cached GET responses
    pub cache: ResponseCache,
    /// Named FIFO queues of JSON payloads
    pub queues: Arc<RwLock<QueueRegistry<Value>>>,
    /// Data service the item handlers call into
    pub items: ItemRepository,
    /// Retry policy for data service calls
    pub retry: RetryPolicy,
    /// Per-tier request budgets
    pub limiters: RateLimiters,
}

impl AppState {
    /// Creates a new AppState around the given cache and retry policy.
    pub fn new(cache: ResponseCache, retry: RetryPolicy) -> Self {
        Self {
            cache,
            queues: Arc::new(RwLock::new(QueueRegistry::new())),
            items: ItemRepository::new(),
            retry,
            limiters: RateLimiters::standard(),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            ResponseCache::from_config(config),
            RetryPolicy::from_config(config),
        )
        .with_limiters(RateLimiters::from_config(config))
    }

    /// Replaces the standard rate limit policies.
    pub fn with_limiters(mut self, limiters: RateLimiters) -> Self {
        self.limiters = limiters;
        self
    }
}

/// Handler for GET /health and GET /api/health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Items ==

/// Handler for GET /api/items
pub async fn list_items_handler(
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<ItemListResponse>> {
    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

    let (items, total) = state
        .retry
        .execute(|| state.items.list(offset, limit))
        .await?;

    Ok(Json(ItemListResponse { items, total }))
}

/// Handler for GET /api/items/:id
pub async fn get_item_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Item>> {
    let item = state.retry.execute(|| state.items.get(id)).await?;
    Ok(Json(item))
}

/// Handler for POST /api/items
///
/// Queues an `item.created` job for follow-up processing.
pub async fn create_item_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>)> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let item = state
        .retry
        .execute(|| state.items.create(&req.name, req.description.clone()))
        .await?;

    let pending = state.queues.write().await.enqueue(
        JOBS_QUEUE,
        json!({ "event": "item.created", "id": item.id }),
    );
    info!(id = item.id, pending, "Item created");

    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for DELETE /api/items/:id
pub async fn delete_item_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DeleteResponse>> {
    state.retry.execute(|| state.items.delete(id)).await?;
    Ok(Json(DeleteResponse::new(id)))
}

// == Queues ==

/// Handler for POST /api/queues/:name
///
/// Any JSON value is accepted as the payload.
pub async fn enqueue_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(item): Json<Value>,
) -> (StatusCode, Json<EnqueueResponse>) {
    let size = state.queues.write().await.enqueue(&name, item);
    (StatusCode::CREATED, Json(EnqueueResponse { queue: name, size }))
}

/// Handler for POST /api/queues/:name/dequeue
pub async fn dequeue_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<DequeueResponse> {
    let mut queues = state.queues.write().await;
    let item = queues.dequeue(&name);
    let remaining = queues.size(&name);

    Json(DequeueResponse {
        queue: name,
        item,
        remaining,
    })
}

/// Handler for GET /api/queues/:name
pub async fn queue_size_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<QueueSizeResponse> {
    let size = state.queues.read().await.size(&name);
    Json(QueueSizeResponse { queue: name, size })
}

/// Handler for GET /api/queues
pub async fn queue_list_handler(State(state): State<AppState>) -> Json<QueueListResponse> {
    let queues = state.queues.read().await;
    Json(QueueListResponse {
        queues: queues.snapshot(),
        total_items: queues.total_items(),
    })
}

// == Cache Admin ==

/// Handler for GET /api/cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let stats = state.cache.stats().await;
    Json(CacheStatsResponse::new(&stats, state.cache.ttl().as_secs()))
}

/// Handler for DELETE /api/cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    let cleared = state.cache.clear().await;
    info!(cleared, "Response cache cleared");
    Json(ClearCacheResponse::new(cleared))
}

//! Response DTOs for the edge service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::queue::QueueSnapshot;
use crate::repository::Item;

/// Response body for `GET /api/items`
#[derive(Debug, Clone, Serialize)]
pub struct ItemListResponse {
    pub items: Vec<Item>,
    /// Total items stored, independent of paging
    pub total: usize,
}

/// Response body for `DELETE /api/items/:id`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub id: u64,
}

impl DeleteResponse {
    pub fn new(id: u64) -> Self {
        Self {
            message: format!("Item {} deleted successfully", id),
            id,
        }
    }
}

/// Response body for `POST /api/queues/:name`
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueResponse {
    pub queue: String,
    /// Queue length after the push
    pub size: usize,
}

/// Response body for `POST /api/queues/:name/dequeue`
///
/// `item` is `null` when the queue was empty or unknown.
#[derive(Debug, Clone, Serialize)]
pub struct DequeueResponse {
    pub queue: String,
    pub item: Option<Value>,
    pub remaining: usize,
}

/// Response body for `GET /api/queues/:name`
#[derive(Debug, Clone, Serialize)]
pub struct QueueSizeResponse {
    pub queue: String,
    pub size: usize,
}

/// Response body for `GET /api/queues`
#[derive(Debug, Clone, Serialize)]
pub struct QueueListResponse {
    pub queues: Vec<QueueSnapshot>,
    pub total_items: usize,
}

/// Response body for `GET /api/cache/stats`
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub invalidations: u64,
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub ttl_secs: u64,
}

impl CacheStatsResponse {
    pub fn new(stats: &CacheStats, ttl_secs: u64) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            invalidations: stats.invalidations,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            ttl_secs,
        }
    }
}

/// Response body for `DELETE /api/cache`
#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    pub message: String,
    pub cleared: usize,
}

impl ClearCacheResponse {
    pub fn new(cleared: usize) -> Self {
        Self {
            message: format!("Cleared {} cached responses", cleared),
            cleared,
        }
    }
}

/// Response body for the health endpoints
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Body returned with HTTP 429
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResponse {
    pub error: String,
    pub retry_after: String,
}

impl RateLimitResponse {
    pub fn new(error: impl Into<String>, retry_after: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            retry_after: retry_after.into(),
        }
    }
}

//! Request and Response models for the edge service API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{CreateItemRequest, ListItemsQuery};
pub use responses::{
    CacheStatsResponse, ClearCacheResponse, DeleteResponse, DequeueResponse, EnqueueResponse,
    HealthResponse, ItemListResponse, QueueListResponse, QueueSizeResponse, RateLimitResponse,
};

//! API Routes
//!
//! Configures the Axum router and its middleware stack.

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, clear_cache_handler, create_item_handler, delete_item_handler,
    dequeue_handler, enqueue_handler, get_item_handler, health_handler, list_items_handler,
    queue_list_handler, queue_size_handler, AppState,
};
use crate::middleware::{cache_response, invalidate_on_mutation, rate_limit};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health`, `GET /api/health` - Health checks (never rate limited)
/// - `GET|POST /api/items`, `GET|DELETE /api/items/:id` - Items (GETs cached)
/// - `GET /api/queues` - Queue snapshot
/// - `GET|POST /api/queues/:name` - Queue size / enqueue
/// - `POST /api/queues/:name/dequeue` - Dequeue head item
/// - `GET /api/cache/stats`, `DELETE /api/cache` - Cache admin (strict limit)
///
/// # Middleware (outermost first)
/// - Tracing and CORS
/// - General rate limit
/// - Mutation invalidation of cached responses
/// - Response cache on item reads
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let items = Router::new()
        .route(
            "/api/items",
            get(list_items_handler).post(create_item_handler),
        )
        .route(
            "/api/items/:id",
            get(get_item_handler).delete(delete_item_handler),
        )
        .route_layer(from_fn_with_state(state.cache.clone(), cache_response));

    let queues = Router::new()
        .route("/api/queues", get(queue_list_handler))
        .route(
            "/api/queues/:name",
            get(queue_size_handler).post(enqueue_handler),
        )
        .route("/api/queues/:name/dequeue", post(dequeue_handler));

    let admin = Router::new()
        .route("/api/cache/stats", get(cache_stats_handler))
        .route("/api/cache", delete(clear_cache_handler))
        .route_layer(from_fn_with_state(
            state.limiters.strict.clone(),
            rate_limit::enforce,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .merge(items)
        .merge(queues)
        .merge(admin)
        .layer(from_fn_with_state(state.cache.clone(), invalidate_on_mutation))
        .layer(from_fn_with_state(
            state.limiters.general.clone(),
            rate_limit::enforce,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! API Module
//!
//! HTTP handlers and routing for the edge service.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET|POST /api/items`, `GET|DELETE /api/items/:id` - Items
//! - `GET /api/queues`, `GET|POST /api/queues/:name`,
//!   `POST /api/queues/:name/dequeue` - Named queues
//! - `GET /api/cache/stats`, `DELETE /api/cache` - Response cache admin

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

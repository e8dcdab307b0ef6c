//! Lunonex Edge - request-level caching, retry, queueing and rate limiting
//!
//! Middleware and in-process utilities that sit in front of the HTTP
//! handlers of a single service instance. State is per process; nothing is
//! shared or kept coherent across horizontally scaled instances.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod queue;
pub mod repository;
pub mod retry;
pub mod tasks;


pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;

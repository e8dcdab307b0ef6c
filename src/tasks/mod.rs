//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cleanup: purges expired cached responses and closed rate-limit windows

mod cleanup;

pub use cleanup::spawn_cleanup_task;

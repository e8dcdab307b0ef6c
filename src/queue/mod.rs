//! Queue Module
//!
//! Named in-memory FIFO queues for deferring or batching lightweight work.

mod registry;

pub use registry::{QueueRegistry, QueueSnapshot};

/// Queue that receives follow-up work emitted by request handlers.
pub const JOBS_QUEUE: &str = "jobs";

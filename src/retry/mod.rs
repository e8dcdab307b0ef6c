//! Retry Module
//!
//! Wraps fallible async operations (remote database or API calls) so that
//! transient failures are retried with exponential backoff while terminal
//! failures surface immediately.

mod error;
mod policy;

pub use error::{OperationError, Retryable};
pub use policy::RetryPolicy;

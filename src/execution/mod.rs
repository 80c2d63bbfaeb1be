//! Query Execution Module
//!
//! Provides the ambient machinery every operator in a query execution
//! tree shares: timeout enforcement and memory-quota tracking. Result
//! caching lives in `operation::cache`, since its keying is specific to
//! an operator's normal-form string.

mod limits;
mod timeout;

pub use limits::{MemoryTracker, ResourceLimits};
pub use timeout::{CancelHandle, QueryTimeout, TimeoutError};

use std::time::Duration;

/// Configuration bundle threaded through a query's `ExecutionContext`
/// (§9's "single context value" rather than ambient globals).
#[derive(Debug, Clone, Copy)]
pub struct ExecutionConfig {
    /// Query timeout duration (`None` = no timeout).
    pub timeout: Option<Duration>,
    /// Resource limits for this query.
    pub limits: ResourceLimits,
}

impl ExecutionConfig {
    pub fn new(timeout: Option<Duration>, limits: ResourceLimits) -> Self {
        ExecutionConfig { timeout, limits }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            timeout: Some(Duration::from_secs(30)),
            limits: ResourceLimits::unlimited(),
        }
    }
}

//! Resource Limits Module
//!
//! Quota-tracking allocator hook for query execution (§5): result tables
//! report their allocations to a shared `MemoryTracker`; exceeding the
//! per-query byte budget fails the allocation and propagates as
//! `Error::OutOfMemory`.
//!
//! ## Design
//!
//! Uses cooperative checking: the scan loops call `reserve` before growing
//! a result table's backing storage, matching the teacher's "check
//! periodically, don't intercept every allocator call" philosophy.

use crate::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Resource limits configuration for a single query.
#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    /// Maximum memory usage in bytes (0 = unlimited).
    pub max_memory_bytes: usize,
}

impl ResourceLimits {
    pub fn unlimited() -> Self {
        ResourceLimits { max_memory_bytes: 0 }
    }

    pub fn bytes(max_memory_bytes: usize) -> Self {
        ResourceLimits { max_memory_bytes }
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Tracks cumulative bytes allocated by result tables for one query,
/// shared across every operator in the tree.
#[derive(Debug, Clone)]
pub struct MemoryTracker {
    used: Arc<AtomicUsize>,
    limit: usize,
}

impl MemoryTracker {
    pub fn new(limits: ResourceLimits) -> Self {
        MemoryTracker {
            used: Arc::new(AtomicUsize::new(0)),
            limit: limits.max_memory_bytes,
        }
    }

    /// Reserve `bytes` more against the quota. Returns `Error::OutOfMemory`
    /// (tagged with `node`'s descriptor) without mutating the counter if
    /// the reservation would exceed the limit.
    pub fn reserve(&self, node: &str, bytes: usize) -> Result<(), Error> {
        if self.limit == 0 {
            self.used.fetch_add(bytes, Ordering::Relaxed);
            return Ok(());
        }
        let mut current = self.used.load(Ordering::Relaxed);
        loop {
            let next = current + bytes;
            if next > self.limit {
                return Err(Error::out_of_memory(node, next, self.limit));
            }
            match self.used.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(observed) => current = observed,
            }
        }
    }

    pub fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub fn used_bytes(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_never_fails() {
        let tracker = MemoryTracker::new(ResourceLimits::unlimited());
        assert!(tracker.reserve("test", 1 << 40).is_ok());
    }

    #[test]
    fn exceeding_limit_fails() {
        let tracker = MemoryTracker::new(ResourceLimits::bytes(100));
        assert!(tracker.reserve("test", 50).is_ok());
        let err = tracker.reserve("test", 60).unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { .. }));
        assert_eq!(tracker.used_bytes(), 50);
    }

    #[test]
    fn release_frees_quota() {
        let tracker = MemoryTracker::new(ResourceLimits::bytes(100));
        tracker.reserve("test", 80).unwrap();
        tracker.release(80);
        assert!(tracker.reserve("test", 80).is_ok());
    }
}

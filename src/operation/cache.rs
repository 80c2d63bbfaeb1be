//! Result Cache
//!
//! A process-wide, capacity-bounded cache keyed by an operator's
//! normal-form string (§4.5). Concurrent callers of the same key share one
//! computation: the first caller becomes the computing thread, later
//! callers block on the pending entry and observe either the shared
//! result or a shared failure. On abort or failure the entry is removed so
//! a retry can proceed, and no waiter is left blocked forever.
//!
//! Grounded on the teacher's choice of `dashmap` for shared concurrent
//! state (`session.rs`, `index_manager.rs`) plus `parking_lot` for the
//! per-entry condition variable.

use super::result_table::ResultTable;
use crate::error::Error;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

enum SlotState {
    Pending,
    Ready(Arc<ResultTable>),
    Failed(Error),
}

struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Slot {
    fn pending() -> Arc<Self> {
        Arc::new(Slot {
            state: Mutex::new(SlotState::Pending),
            ready: Condvar::new(),
        })
    }
}

/// Snapshot of cache hit/miss counters, exposed for observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub evictions: usize,
}

/// A shared, concurrent result cache with LRU eviction over a byte budget.
pub struct ResultCache {
    entries: DashMap<String, Arc<Slot>>,
    order: Mutex<VecDeque<String>>,
    sizes: DashMap<String, usize>,
    current_bytes: AtomicUsize,
    max_entries: usize,
    max_bytes: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
    evictions: AtomicUsize,
}

impl ResultCache {
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        ResultCache {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            sizes: DashMap::new(),
            current_bytes: AtomicUsize::new(0),
            max_entries,
            max_bytes,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            evictions: AtomicUsize::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Look up `key`; on a miss, call `produce` exactly once (by whichever
    /// caller arrives first) and share its result with any concurrent
    /// waiters for the same key.
    pub fn get_or_compute(
        &self,
        key: &str,
        produce: impl FnOnce() -> Result<ResultTable, Error>,
    ) -> Result<Arc<ResultTable>, Error> {
        loop {
            let (slot, is_computer) = match self.entries.entry(key.to_string()) {
                dashmap::mapref::entry::Entry::Occupied(e) => (e.get().clone(), false),
                dashmap::mapref::entry::Entry::Vacant(v) => {
                    let slot = Slot::pending();
                    v.insert(slot.clone());
                    (slot, true)
                }
            };

            if is_computer {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "result cache miss, computing");
                return match produce() {
                    Ok(result) => {
                        let result = Arc::new(result);
                        let bytes = estimate_bytes(&result);
                        {
                            let mut state = slot.state.lock();
                            *state = SlotState::Ready(result.clone());
                        }
                        slot.ready.notify_all();
                        self.record_size(key, bytes);
                        self.evict_if_needed();
                        Ok(result)
                    }
                    Err(err) => {
                        {
                            let mut state = slot.state.lock();
                            *state = SlotState::Failed(err.clone());
                        }
                        slot.ready.notify_all();
                        // Erase so a retry can recompute from scratch.
                        self.entries.remove(key);
                        Err(err)
                    }
                };
            }

            // Waiter path: block on the existing entry until it resolves.
            let mut state = slot.state.lock();
            loop {
                match &*state {
                    SlotState::Pending => slot.ready.wait(&mut state),
                    SlotState::Ready(result) => {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(key, "result cache hit");
                        return Ok(result.clone());
                    }
                    SlotState::Failed(err) => {
                        tracing::warn!(key, error = %err, "result cache entry failed");
                        return Err(err.clone());
                    }
                }
            }
        }
    }

    /// Remove `key` unconditionally, e.g. on explicit operator abort.
    pub fn erase(&self, key: &str) {
        self.entries.remove(key);
        if let Some((_, bytes)) = self.sizes.remove(key) {
            self.current_bytes.fetch_sub(bytes, Ordering::Relaxed);
        }
        self.order.lock().retain(|k| k != key);
    }

    fn record_size(&self, key: &str, bytes: usize) {
        self.sizes.insert(key.to_string(), bytes);
        self.current_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.order.lock().push_back(key.to_string());
    }

    fn evict_if_needed(&self) {
        loop {
            let too_many_entries = self.max_entries != 0 && self.entries.len() > self.max_entries;
            let too_many_bytes =
                self.max_bytes != 0 && self.current_bytes.load(Ordering::Relaxed) > self.max_bytes;
            if !too_many_entries && !too_many_bytes {
                break;
            }
            let oldest = { self.order.lock().pop_front() };
            match oldest {
                Some(key) => {
                    self.erase(&key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        ResultCache::new(1000, 512 * 1024 * 1024)
    }
}

fn estimate_bytes(table: &ResultTable) -> usize {
    table.size() * table.cols() * std::mem::size_of::<u64>()
}

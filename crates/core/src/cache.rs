//! Recency cache: short-term memory of already-alerted indicator values.
//!
//! The pipeline reads the cache when filtering and writes it only after all
//! emitters for a run have been attempted, so cache state changes between
//! runs, never mid-run.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Suppresses repeat alerts for recently seen indicator values.
pub trait RecencyCache: Send + Sync {
    /// Whether this value was marked seen within the retention window.
    fn cached(&self, data: &str) -> bool;

    /// Record that this value was alerted on.
    fn mark_seen(&self, data: &str);
}

/// In-memory cache keyed by artifact data with a fixed retention window.
///
/// Expired entries are evicted lazily on lookup.
pub struct MemoryCache {
    retention: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl MemoryCache {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Number of unexpired entries.
    pub fn len(&self) -> usize {
        let mut seen = self.seen.lock().expect("cache lock poisoned");
        let retention = self.retention;
        seen.retain(|_, at| at.elapsed() < retention);
        seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecencyCache for MemoryCache {
    fn cached(&self, data: &str) -> bool {
        let mut seen = self.seen.lock().expect("cache lock poisoned");
        let retention = self.retention;
        seen.retain(|_, at| at.elapsed() < retention);
        seen.contains_key(data)
    }

    fn mark_seen(&self, data: &str) {
        self.seen
            .lock()
            .expect("cache lock poisoned")
            .insert(data.to_string(), Instant::now());
    }
}

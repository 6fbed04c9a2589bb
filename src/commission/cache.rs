//! TTL cache for hot analytics responses.
//!
//! Replaces the historical ad hoc global `Map` with manual expiry checks.
//! Invalidation is time-based only: entries written during a sync cycle
//! serve slightly stale figures until they expire, which the dashboard
//! accepts.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (V, Instant)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some((_, written)) if written.elapsed() >= self.ttl => {
                entries.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(key.into(), (value, Instant::now()));
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }
}

/// Cached, already-serialized analytics payloads.
pub type AnalyticsCache = TtlCache<serde_json::Value>;

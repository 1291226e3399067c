use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

/// Millisecond wall clock used for expiry checks.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

pub struct CacheEntry<V> {
    pub data: V,
    pub expires_at_ms: i64,
}

/// Key/value store where every entry carries its own expiry.
///
/// Expired entries are never swept; they linger until the same key is
/// written again.
pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    /// Returns the cached value, or `None` when the key is absent or past its expiry.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        if self.clock.now_ms() > entry.expires_at_ms {
            return None;
        }
        Some(entry.data.clone())
    }

    pub fn set(&mut self, key: impl Into<String>, data: V, ttl_ms: i64) {
        let expires_at_ms = self.clock.now_ms().saturating_add(ttl_ms);
        self.entries.insert(
            key.into(),
            CacheEntry {
                data,
                expires_at_ms,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

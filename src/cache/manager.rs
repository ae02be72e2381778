//! Cache manager for keeping proxy responses in memory
//!
//! Provides a `CacheManager` that stores one value per key together with the
//! time it was cached and the time it expires. Nothing is persisted; entries
//! live until they are overwritten, evicted to make room, or the process exits.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Default upper bound on the number of keys a single cache holds
pub const DEFAULT_CAPACITY: usize = 1024;

/// Wrapper struct for a cached value
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    /// The cached data
    data: T,
    /// When the data was cached
    cached_at: DateTime<Utc>,
    /// When the cache entry expires
    expires_at: DateTime<Utc>,
}

/// Result of reading from cache, including metadata about cache freshness
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// Whether the cache entry has expired
    pub is_expired: bool,
}

/// Manages reading and writing cached values for a single proxy
///
/// Expired entries are still returned (with `is_expired = true`); the caller
/// decides whether a stale value is usable. The map is concurrent, and no
/// shard lock is held once `read` or `write` returns.
#[derive(Debug)]
pub struct CacheManager<T> {
    entries: DashMap<String, CacheEntry<T>>,
    capacity: usize,
}

impl<T: Clone> Default for CacheManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> CacheManager<T> {
    /// Creates a new CacheManager bounded to `DEFAULT_CAPACITY` keys
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a new CacheManager holding at most `capacity` keys
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Maximum number of keys this cache holds
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of keys currently cached, fresh or expired
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Writes data to the cache, fresh for `ttl` starting at `now`
    ///
    /// Overwrites any existing entry for `key`. When `key` is new and the
    /// cache is full, expired entries are dropped first and, if that frees
    /// nothing, the oldest entry is evicted.
    ///
    /// # Arguments
    /// * `key` - Unique identifier for the cache entry (e.g., "circuits_all")
    /// * `data` - The value to cache
    /// * `ttl` - How long the entry should be considered fresh
    /// * `now` - The instant the value was produced
    pub fn write(&self, key: &str, data: T, ttl: Duration, now: DateTime<Utc>) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            self.make_room(now);
        }

        // A TTL past the end of the calendar never expires
        let expires_at = now
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let entry = CacheEntry {
            data,
            cached_at: now,
            expires_at,
        };

        self.entries.insert(key.to_string(), entry);
    }

    /// Reads data from the cache as of `now`
    ///
    /// # Returns
    /// * `Some(CachedData<T>)` if the entry exists, with `is_expired` set once
    ///   `now` has reached the entry's expiry time
    /// * `None` if the entry doesn't exist
    pub fn read(&self, key: &str, now: DateTime<Utc>) -> Option<CachedData<T>> {
        let entry = self.entries.get(key)?;

        Some(CachedData {
            data: entry.data.clone(),
            cached_at: entry.cached_at,
            is_expired: now >= entry.expires_at,
        })
    }

    fn make_room(&self, now: DateTime<Utc>) {
        self.entries.retain(|_, entry| now < entry.expires_at);
        if self.entries.len() < self.capacity {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.cached_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

//! Cache module for holding proxy responses in memory
//!
//! This module provides a cache manager that keeps values per key with a
//! configurable TTL (time-to-live). Expired entries are still readable with an
//! `is_expired` flag, so the caller owns the freshness decision.

mod manager;

pub use manager::{CacheManager, CachedData, DEFAULT_CAPACITY};

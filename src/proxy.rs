//! Cached fallback proxy
//!
//! A `CachedFallbackProxy` answers every request with a well-shaped payload:
//! fresh upstream data when the provider answers, a pinned sample when it
//! doesn't. Whatever was produced is cached under the request's key for the
//! proxy's TTL, so an outage is retried at most once per TTL window.
//!
//! The per-endpoint behaviour (cache key, upstream call, response shaping and
//! sample) lives in a [`ProxyPolicy`].

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheManager, DEFAULT_CAPACITY};
use crate::error::UpstreamError;

/// Default bound on a single upstream attempt
pub const DEFAULT_UPSTREAM_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Endpoint-specific half of a cached fallback proxy
pub trait ProxyPolicy: Send + Sync {
    /// Request parameters the cache key is derived from
    type Params: Send + Sync;
    /// Whatever `fetch` hands to `shape`
    type Raw: Send;
    /// Caller-facing payload, carrying its own provenance tag
    type Output: Clone + Send + Sync + Serialize;

    /// Short name used in log lines
    fn name(&self) -> &'static str;

    fn cache_key(&self, params: &Self::Params) -> String;

    /// Calls the upstream provider. Any error sends the request down the
    /// sample path.
    fn fetch<'a>(&'a self, params: &'a Self::Params)
        -> BoxFuture<'a, Result<Self::Raw, UpstreamError>>;

    /// Turns a successful upstream answer into the caller-facing payload.
    /// Missing fields become empty collections or `None`, never errors.
    fn shape(&self, params: &Self::Params, raw: Self::Raw) -> Self::Output;

    /// Deterministic substitute used when `fetch` fails.
    fn sample(&self, params: &Self::Params) -> Self::Output;
}

/// How a resolution was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a fresh cache entry
    Hit,
    /// Fetched from upstream
    Miss,
    /// Upstream failed, sample served
    Fallback,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Fallback => "fallback",
        }
    }
}

/// Payload returned by a proxy plus how it was obtained
#[derive(Debug, Clone)]
pub struct Resolution<T> {
    pub payload: T,
    pub status: CacheStatus,
}

/// TTL-cached proxy that substitutes a sample on upstream failure
pub struct CachedFallbackProxy<P: ProxyPolicy> {
    policy: P,
    ttl: StdDuration,
    upstream_timeout: StdDuration,
    cache: CacheManager<P::Output>,
}

impl<P: ProxyPolicy> CachedFallbackProxy<P> {
    /// Creates a proxy caching every result of `policy` for `ttl`
    pub fn new(policy: P, ttl: StdDuration) -> Self {
        Self {
            policy,
            ttl,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            cache: CacheManager::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Overrides the bound on a single upstream attempt
    pub fn with_upstream_timeout(mut self, timeout: StdDuration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    /// Overrides how many keys the cache holds
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = CacheManager::with_capacity(capacity);
        self
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn ttl(&self) -> StdDuration {
        self.ttl
    }

    pub fn upstream_timeout(&self) -> StdDuration {
        self.upstream_timeout
    }

    pub fn cache(&self) -> &CacheManager<P::Output> {
        &self.cache
    }

    /// Resolves `params` against the current wall clock
    pub async fn resolve(&self, params: &P::Params) -> Resolution<P::Output> {
        self.resolve_at(params, Utc::now()).await
    }

    /// Resolves `params` as of `now`
    ///
    /// A fresh entry short-circuits all upstream interaction. Otherwise the
    /// upstream is called once, without retries; on failure the policy's
    /// sample is used. Either way the result is cached with `now` as its
    /// timestamp before being returned.
    pub async fn resolve_at(&self, params: &P::Params, now: DateTime<Utc>) -> Resolution<P::Output> {
        let key = self.policy.cache_key(params);

        if let Some(cached) = self.cache.read(&key, now) {
            if !cached.is_expired {
                debug!(proxy = self.policy.name(), %key, "cache hit");
                return Resolution {
                    payload: cached.data,
                    status: CacheStatus::Hit,
                };
            }
        }

        let (payload, status) = match self.fetch_upstream(params).await {
            Ok(raw) => (self.policy.shape(params, raw), CacheStatus::Miss),
            Err(e) => {
                warn!(
                    proxy = self.policy.name(),
                    %key,
                    error = %e,
                    "upstream fetch failed, returning fallback sample"
                );
                (self.policy.sample(params), CacheStatus::Fallback)
            }
        };

        self.cache.write(&key, payload.clone(), ttl_delta(self.ttl), now);

        Resolution { payload, status }
    }

    async fn fetch_upstream(&self, params: &P::Params) -> Result<P::Raw, UpstreamError> {
        tokio::time::timeout(self.upstream_timeout, self.policy.fetch(params))
            .await
            .map_err(|_| UpstreamError::Timeout(self.upstream_timeout))?
    }
}

fn ttl_delta(ttl: StdDuration) -> Duration {
    Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(365))
}

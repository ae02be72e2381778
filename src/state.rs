use std::sync::Arc;

use crate::cli::ServerConfig;
use crate::data::circuits::CIRCUITS_TTL;
use crate::data::drivers::DRIVERS_TTL;
use crate::data::standings::STANDINGS_TTL;
use crate::data::{
    build_http_client, CircuitsPolicy, DriversPolicy, ErgastClient, FastF1Client, StandingsPolicy,
    TelemetryPolicy,
};
use crate::proxy::{CachedFallbackProxy, ProxyPolicy};

/// Shared server state: one cached fallback proxy per endpoint
pub struct AppState {
    pub circuits: CachedFallbackProxy<CircuitsPolicy>,
    pub drivers: CachedFallbackProxy<DriversPolicy>,
    pub standings: CachedFallbackProxy<StandingsPolicy>,
    pub telemetry: CachedFallbackProxy<TelemetryPolicy>,
}

impl AppState {
    /// Builds the proxies from a validated configuration.
    ///
    /// All upstream calls share one connection pool.
    pub fn new(config: &ServerConfig) -> Result<Arc<Self>, reqwest::Error> {
        let http = build_http_client(config.upstream_timeout)?;

        let ergast = ErgastClient::with_client(http.clone()).with_base_url(&config.ergast_url);
        let fastf1 = FastF1Client::with_client(http).with_base_url(&config.fastf1_url);

        Ok(Arc::new(Self {
            circuits: configure_proxy(
                CachedFallbackProxy::new(CircuitsPolicy::new(ergast.clone()), CIRCUITS_TTL),
                config,
            ),
            drivers: configure_proxy(
                CachedFallbackProxy::new(DriversPolicy::new(ergast.clone()), DRIVERS_TTL),
                config,
            ),
            standings: configure_proxy(
                CachedFallbackProxy::new(StandingsPolicy::new(ergast), STANDINGS_TTL),
                config,
            ),
            telemetry: configure_proxy(
                CachedFallbackProxy::new(TelemetryPolicy::new(fastf1), config.telemetry_ttl),
                config,
            ),
        }))
    }
}

fn configure_proxy<P: ProxyPolicy>(
    proxy: CachedFallbackProxy<P>,
    config: &ServerConfig,
) -> CachedFallbackProxy<P> {
    proxy
        .with_upstream_timeout(config.upstream_timeout)
        .with_cache_capacity(config.cache_capacity)
}

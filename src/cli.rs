//! Command-line interface parsing for the Pitwall server
//!
//! Every flag can also be set through an environment variable, which is how
//! the server is normally configured in a container.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::cache::DEFAULT_CAPACITY;
use crate::data::ergast::ERGAST_BASE_URL;
use crate::data::telemetry::{DEFAULT_TELEMETRY_TTL, FASTF1_BASE_URL};
use crate::proxy::DEFAULT_UPSTREAM_TIMEOUT;

/// Error types for turning CLI arguments into a server configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Host and port don't form a socket address
    #[error("Invalid bind address '{0}'")]
    InvalidBindAddress(String),

    /// A provider URL isn't an http(s) URL
    #[error("Invalid {name} URL '{value}': expected http:// or https://")]
    InvalidBaseUrl { name: &'static str, value: String },

    /// A zero upstream timeout would fail every request
    #[error("Upstream timeout must be at least one second")]
    ZeroTimeout,
}

/// Pitwall - Formula 1 dashboard API proxy
#[derive(Parser, Debug)]
#[command(name = "pitwall")]
#[command(about = "Formula 1 data proxy with short-lived caching and sample fallbacks")]
#[command(version)]
pub struct Cli {
    /// Interface to listen on
    #[arg(long, env = "PITWALL_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Base URL of the Ergast-compatible statistics API
    #[arg(long, env = "ERGAST_BASE_URL", default_value = ERGAST_BASE_URL)]
    pub ergast_url: String,

    /// Base URL of the FastF1 telemetry proxy
    #[arg(long, env = "FASTF1_PROXY_URL", default_value = FASTF1_BASE_URL)]
    pub fastf1_url: String,

    /// How long telemetry responses are cached
    #[arg(long, env = "FASTF1_CACHE_TTL", value_name = "SECONDS", default_value_t = DEFAULT_TELEMETRY_TTL.as_secs())]
    pub telemetry_ttl: u64,

    /// Upper bound on a single upstream request before the sample is served
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", value_name = "SECONDS", default_value_t = DEFAULT_UPSTREAM_TIMEOUT.as_secs())]
    pub upstream_timeout: u64,

    /// Maximum number of cached keys per endpoint
    #[arg(long, env = "PITWALL_CACHE_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub cache_capacity: usize,
}

/// Validated configuration the server starts from
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub ergast_url: String,
    pub fastf1_url: String,
    pub telemetry_ttl: Duration,
    pub upstream_timeout: Duration,
    pub cache_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            ergast_url: ERGAST_BASE_URL.to_string(),
            fastf1_url: FASTF1_BASE_URL.to_string(),
            telemetry_ttl: DEFAULT_TELEMETRY_TTL,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Creates a ServerConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(ServerConfig)` with validated settings
    /// * `Err(ConfigError)` if the bind address, a URL, or the timeout is unusable
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let address = if cli.host.contains(':') {
            format!("[{}]:{}", cli.host, cli.port)
        } else {
            format!("{}:{}", cli.host, cli.port)
        };
        let bind_addr = address
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddress(address))?;

        if cli.upstream_timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            bind_addr,
            ergast_url: validate_url("ergast", &cli.ergast_url)?,
            fastf1_url: validate_url("fastf1", &cli.fastf1_url)?,
            telemetry_ttl: Duration::from_secs(cli.telemetry_ttl),
            upstream_timeout: Duration::from_secs(cli.upstream_timeout),
            cache_capacity: cli.cache_capacity,
        })
    }
}

fn validate_url(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .is_some_and(|rest| !rest.is_empty());

    if has_host {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidBaseUrl {
            name,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parses a full argument list, replacing the value of any flag named in `overrides`
    fn args(overrides: &[(&str, &str)]) -> Cli {
        let defaults = [
            ("--host", "127.0.0.1"),
            ("--port", "8080"),
            ("--ergast-url", "https://api.jolpi.ca/ergast/f1/"),
            ("--fastf1-url", "http://fastf1:5000"),
            ("--telemetry-ttl", "45"),
            ("--upstream-timeout", "4"),
            ("--cache-capacity", "64"),
        ];

        let mut argv = vec!["pitwall"];
        for (flag, value) in defaults {
            let value = overrides
                .iter()
                .find(|(name, _)| *name == flag)
                .map_or(value, |(_, v)| *v);
            argv.push(flag);
            argv.push(value);
        }
        Cli::parse_from(argv)
    }

    #[test]
    fn test_cli_parse_no_args() {
        assert!(Cli::try_parse_from(["pitwall"]).is_ok());
    }

    #[test]
    fn test_server_config_from_cli() {
        let config = ServerConfig::from_cli(&args(&[])).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.ergast_url, "https://api.jolpi.ca/ergast/f1");
        assert_eq!(config.fastf1_url, "http://fastf1:5000");
        assert_eq!(config.telemetry_ttl, Duration::from_secs(45));
        assert_eq!(config.upstream_timeout, Duration::from_secs(4));
        assert_eq!(config.cache_capacity, 64);
    }

    #[test]
    fn test_server_config_accepts_ipv6_host() {
        let config = ServerConfig::from_cli(&args(&[("--host", "::1")])).unwrap();
        assert_eq!(config.bind_addr, "[::1]:8080".parse().unwrap());
    }

    #[test]
    fn test_server_config_rejects_bad_host() {
        let result = ServerConfig::from_cli(&args(&[("--host", "not a host")]));
        assert!(matches!(result, Err(ConfigError::InvalidBindAddress(_))));
    }

    #[test]
    fn test_server_config_rejects_non_http_url() {
        let result = ServerConfig::from_cli(&args(&[("--fastf1-url", "localhost:5000")]));

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { name: "fastf1", .. }));
        assert!(err.to_string().contains("localhost:5000"));
    }

    #[test]
    fn test_server_config_rejects_zero_timeout() {
        let result = ServerConfig::from_cli(&args(&[("--upstream-timeout", "0")]));
        assert!(matches!(result, Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_zero_telemetry_ttl_is_allowed() {
        let config = ServerConfig::from_cli(&args(&[("--telemetry-ttl", "0")])).unwrap();
        assert_eq!(config.telemetry_ttl, Duration::ZERO);
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.ergast_url, ERGAST_BASE_URL);
        assert_eq!(config.fastf1_url, "http://localhost:5000");
        assert_eq!(config.telemetry_ttl, Duration::from_secs(30));
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(validate_url("x", "https://a.example/").unwrap(), "https://a.example");
        assert!(validate_url("x", "https://").is_err());
        assert!(validate_url("x", "ftp://a.example").is_err());
    }
}

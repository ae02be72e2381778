//! Pitwall - Formula 1 dashboard API proxy
//!
//! Fronts the Ergast statistics API and a FastF1 telemetry proxy. Every
//! endpoint caches its answer for a fixed TTL and falls back to a pinned
//! sample payload when the upstream is unreachable, so the dashboard always
//! gets a well-shaped response.

pub mod cache;
pub mod cli;
pub mod data;
pub mod error;
pub mod proxy;
pub mod routes;
pub mod server;
pub mod state;

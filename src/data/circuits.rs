//! Circuits listing
//!
//! Near-static data: every circuit the Ergast API knows about, cached for a
//! day.

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{extract_list, lenient_id, lenient_record, lenient_string, ErgastClient, Source};
use crate::error::UpstreamError;
use crate::proxy::ProxyPolicy;

/// Cache TTL for the circuits listing (24 hours)
pub const CIRCUITS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const CIRCUITS_CACHE_KEY: &str = "circuits_all";
const CIRCUITS_PATH: &str = "circuits.json";
const CIRCUITS_POINTER: &str = "/MRData/CircuitTable/Circuits";

/// Where a circuit is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "lenient_string")]
    pub locality: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lat: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub long: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single circuit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    #[serde(default, deserialize_with = "lenient_id")]
    pub circuit_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub circuit_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(rename = "Location", default, deserialize_with = "lenient_record")]
    pub location: Option<Location>,
    /// Upstream fields not listed above, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of the circuits endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitsResponse {
    pub source: Source,
    pub circuits: Vec<Circuit>,
}

/// Proxy policy for the circuits listing
#[derive(Debug, Clone)]
pub struct CircuitsPolicy {
    client: ErgastClient,
}

impl CircuitsPolicy {
    pub fn new(client: ErgastClient) -> Self {
        Self { client }
    }
}

impl ProxyPolicy for CircuitsPolicy {
    type Params = ();
    type Raw = Value;
    type Output = CircuitsResponse;

    fn name(&self) -> &'static str {
        "circuits"
    }

    fn cache_key(&self, _params: &()) -> String {
        CIRCUITS_CACHE_KEY.to_string()
    }

    fn fetch<'a>(&'a self, _params: &'a ()) -> BoxFuture<'a, Result<Value, UpstreamError>> {
        self.client
            .fetch_json(CIRCUITS_PATH, &[("limit", "1000")])
            .boxed()
    }

    fn shape(&self, _params: &(), raw: Value) -> CircuitsResponse {
        CircuitsResponse {
            source: Source::Ergast,
            circuits: extract_list(&raw, CIRCUITS_POINTER),
        }
    }

    fn sample(&self, _params: &()) -> CircuitsResponse {
        sample_circuits()
    }
}

/// Fallback listing served when the upstream is unavailable
pub fn sample_circuits() -> CircuitsResponse {
    CircuitsResponse {
        source: Source::Sample,
        circuits: vec![
            sample_circuit("monza", "Autodromo Nazionale di Monza", "Monza", "Italy"),
            sample_circuit("spa", "Circuit de Spa-Francorchamps", "Stavelot", "Belgium"),
            sample_circuit("suzuka", "Suzuka Circuit", "Suzuka", "Japan"),
        ],
    }
}

fn sample_circuit(id: &str, name: &str, locality: &str, country: &str) -> Circuit {
    Circuit {
        circuit_id: id.to_string(),
        circuit_name: Some(name.to_string()),
        url: None,
        location: Some(Location {
            locality: Some(locality.to_string()),
            country: Some(country.to_string()),
            lat: None,
            long: None,
            extra: Map::new(),
        }),
        extra: Map::new(),
    }
}

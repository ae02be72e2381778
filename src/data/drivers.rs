//! Current drivers listing
//!
//! The roster changes a few times a season at most; cached for five minutes.

use std::time::Duration;

use chrono::{Datelike, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{extract_list, extract_text, lenient_id, lenient_string, ErgastClient, Source};
use crate::error::UpstreamError;
use crate::proxy::ProxyPolicy;

/// Cache TTL for the drivers listing (5 minutes)
pub const DRIVERS_TTL: Duration = Duration::from_secs(5 * 60);

const DRIVERS_CACHE_KEY: &str = "drivers_current";
const DRIVERS_PATH: &str = "current/drivers.json";
const DRIVERS_POINTER: &str = "/MRData/DriverTable/Drivers";

/// A driver record as published by Ergast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    #[serde(default, deserialize_with = "lenient_id")]
    pub driver_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub permanent_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub given_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub family_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nationality: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Driver {
    /// Minimal record used by the fallback samples
    pub(crate) fn named(id: &str, given_name: &str, family_name: &str, nationality: &str) -> Self {
        Self {
            driver_id: id.to_string(),
            permanent_number: None,
            code: None,
            given_name: Some(given_name.to_string()),
            family_name: Some(family_name.to_string()),
            date_of_birth: None,
            nationality: Some(nationality.to_string()),
            url: None,
            extra: Map::new(),
        }
    }
}

/// Payload of the drivers endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriversResponse {
    pub source: Source,
    pub season: Option<String>,
    pub drivers: Vec<Driver>,
}

/// Proxy policy for the current-season drivers listing
#[derive(Debug, Clone)]
pub struct DriversPolicy {
    client: ErgastClient,
}

impl DriversPolicy {
    pub fn new(client: ErgastClient) -> Self {
        Self { client }
    }
}

impl ProxyPolicy for DriversPolicy {
    type Params = ();
    type Raw = Value;
    type Output = DriversResponse;

    fn name(&self) -> &'static str {
        "drivers"
    }

    fn cache_key(&self, _params: &()) -> String {
        DRIVERS_CACHE_KEY.to_string()
    }

    fn fetch<'a>(&'a self, _params: &'a ()) -> BoxFuture<'a, Result<Value, UpstreamError>> {
        self.client.fetch_json(DRIVERS_PATH, &[]).boxed()
    }

    fn shape(&self, _params: &(), raw: Value) -> DriversResponse {
        // Ergast puts the season on the table; older mirrors put it on the envelope.
        let season = extract_text(&raw, "/MRData/DriverTable/season")
            .or_else(|| extract_text(&raw, "/MRData/season"));

        DriversResponse {
            source: Source::Ergast,
            season,
            drivers: extract_list(&raw, DRIVERS_POINTER),
        }
    }

    fn sample(&self, _params: &()) -> DriversResponse {
        sample_drivers()
    }
}

/// Fallback roster, labeled with the current calendar year
pub fn sample_drivers() -> DriversResponse {
    DriversResponse {
        source: Source::Sample,
        season: Some(Utc::now().year().to_string()),
        drivers: vec![
            Driver::named("verstappen", "Max", "Verstappen", "Dutch"),
            Driver::named("hamilton", "Lewis", "Hamilton", "British"),
            Driver::named("norris", "Lando", "Norris", "British"),
        ],
    }
}

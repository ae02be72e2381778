//! Driver standings for the current and previous season
//!
//! The only endpoint that needs two upstream calls: the current standings
//! first, then the standings of the season before the one the first response
//! reports. The pair succeeds or fails as a unit.
//!
//! Provenance on the upstream path is a heuristic. The result is labeled
//! `ergast` only when the first current-season entry carries a `Driver`
//! object, and `sample` otherwise. So an upstream that returns an empty
//! table is reported as `sample`, and an upstream body shaped like the
//! sample is reported as `ergast`. The fallback path is always labeled
//! `sample` without consulting the heuristic.

use std::time::Duration;

use chrono::{Datelike, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::drivers::Driver;
use super::{
    extract_list, extract_text, lenient_list, lenient_record, lenient_string, ErgastClient, Source,
};
use crate::error::UpstreamError;
use crate::proxy::ProxyPolicy;

/// Cache TTL for standings (60 seconds)
pub const STANDINGS_TTL: Duration = Duration::from_secs(60);

const STANDINGS_CACHE_KEY: &str = "standings_current_prev";
const CURRENT_STANDINGS_PATH: &str = "current/driverStandings.json";
const STANDINGS_POINTER: &str = "/MRData/StandingsTable/StandingsLists/0/DriverStandings";
const SEASON_POINTER: &str = "/MRData/StandingsTable/season";

/// A constructor reference inside a standings entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constructor {
    #[serde(default, deserialize_with = "lenient_string")]
    pub constructor_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nationality: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One row of a driver standings table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverStanding {
    #[serde(default, deserialize_with = "lenient_string")]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub points: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub wins: Option<String>,
    #[serde(rename = "Driver", default, deserialize_with = "lenient_record")]
    pub driver: Option<Driver>,
    #[serde(rename = "Constructors", default, deserialize_with = "lenient_list")]
    pub constructors: Vec<Constructor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of the standings endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsResponse {
    pub source: Source,
    pub season: Option<String>,
    pub drivers_current: Vec<DriverStanding>,
    pub drivers_previous: Vec<DriverStanding>,
}

/// Both upstream documents; `previous` is absent when the current one names no season
#[derive(Debug, Clone)]
pub struct StandingsPair {
    pub current: Value,
    pub previous: Option<Value>,
}

/// Proxy policy for current + previous season standings
#[derive(Debug, Clone)]
pub struct StandingsPolicy {
    client: ErgastClient,
}

impl StandingsPolicy {
    pub fn new(client: ErgastClient) -> Self {
        Self { client }
    }

    async fn fetch_pair(&self) -> Result<StandingsPair, UpstreamError> {
        let current = self.client.fetch_json(CURRENT_STANDINGS_PATH, &[]).await?;

        let previous = match extract_text(&current, SEASON_POINTER).and_then(|s| previous_season(&s)) {
            Some(season) => {
                let path = format!("{season}/driverStandings.json");
                Some(self.client.fetch_json(&path, &[]).await?)
            }
            None => None,
        };

        Ok(StandingsPair { current, previous })
    }
}

impl ProxyPolicy for StandingsPolicy {
    type Params = ();
    type Raw = StandingsPair;
    type Output = StandingsResponse;

    fn name(&self) -> &'static str {
        "standings"
    }

    fn cache_key(&self, _params: &()) -> String {
        STANDINGS_CACHE_KEY.to_string()
    }

    fn fetch<'a>(&'a self, _params: &'a ()) -> BoxFuture<'a, Result<StandingsPair, UpstreamError>> {
        self.fetch_pair().boxed()
    }

    fn shape(&self, _params: &(), raw: StandingsPair) -> StandingsResponse {
        let drivers_current: Vec<DriverStanding> = extract_list(&raw.current, STANDINGS_POINTER);
        let drivers_previous = raw
            .previous
            .as_ref()
            .map(|previous| extract_list(previous, STANDINGS_POINTER))
            .unwrap_or_default();

        StandingsResponse {
            source: infer_source(&drivers_current),
            season: extract_text(&raw.current, SEASON_POINTER),
            drivers_current,
            drivers_previous,
        }
    }

    fn sample(&self, _params: &()) -> StandingsResponse {
        sample_standings()
    }
}

/// Season before `season`, if `season` is a year
fn previous_season(season: &str) -> Option<String> {
    season
        .trim()
        .parse::<i32>()
        .ok()
        .and_then(|year| year.checked_sub(1))
        .map(|year| year.to_string())
}

/// Labels a fetched table by its shape rather than trusting any upstream label
fn infer_source(drivers_current: &[DriverStanding]) -> Source {
    match drivers_current.first() {
        Some(entry) if entry.driver.is_some() => Source::Ergast,
        _ => Source::Sample,
    }
}

/// Fallback standings for both seasons, labeled with the current calendar year
pub fn sample_standings() -> StandingsResponse {
    StandingsResponse {
        source: Source::Sample,
        season: Some(Utc::now().year().to_string()),
        drivers_current: vec![
            sample_row("1", "525", Driver::named("verstappen", "Max", "Verstappen", "Dutch"), "Red Bull Racing"),
            sample_row("2", "325", Driver::named("hamilton", "Lewis", "Hamilton", "British"), "Mercedes"),
            sample_row("3", "220", Driver::named("norris", "Lando", "Norris", "British"), "McLaren"),
        ],
        drivers_previous: vec![
            sample_row("1", "454", Driver::named("verstappen", "Max", "Verstappen", "Dutch"), "Red Bull Racing"),
            sample_row("2", "308", Driver::named("leclerc", "Charles", "Leclerc", "Monegasque"), "Ferrari"),
            sample_row("3", "305", Driver::named("perez", "Sergio", "Pérez", "Mexican"), "Red Bull Racing"),
        ],
    }
}

fn sample_row(position: &str, points: &str, driver: Driver, constructor: &str) -> DriverStanding {
    DriverStanding {
        position: Some(position.to_string()),
        points: Some(points.to_string()),
        wins: None,
        driver: Some(driver),
        constructors: vec![Constructor {
            constructor_id: None,
            name: Some(constructor.to_string()),
            nationality: None,
            extra: Map::new(),
        }],
        extra: Map::new(),
    }
}

//! Session telemetry from a FastF1 proxy
//!
//! The FastF1 proxy answers in two shapes. The compact shape has one summary
//! per driver, with lap fields either at the top level or under
//! `fastestLap`. The full shape (`detail=full`) has a per-driver `laps`
//! list. Both are normalized to a single lap-list shape before caching.

use std::time::Duration;

use chrono::{Datelike, Utc};
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{get_json, scalar_to_string, Source};
use crate::error::UpstreamError;
use crate::proxy::ProxyPolicy;

/// Default address of the FastF1 proxy
pub const FASTF1_BASE_URL: &str = "http://localhost:5000";

/// Default cache TTL for telemetry (30 seconds)
pub const DEFAULT_TELEMETRY_TTL: Duration = Duration::from_secs(30);

const SESSION_PATH: &str = "telemetry/session";

/// Query parameters of the telemetry endpoint, all optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionParams {
    pub season: Option<String>,
    pub round: Option<String>,
    pub detail: Option<String>,
}

/// Which session to fetch; also the cache key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionQuery {
    pub season: String,
    pub round: String,
    pub detail: Option<String>,
}

impl SessionQuery {
    /// Fills in defaults: the current year, round 1, compact detail
    pub fn from_params(params: SessionParams) -> Self {
        Self::from_params_in_year(params, Utc::now().year())
    }

    fn from_params_in_year(params: SessionParams, year: i32) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        Self {
            season: non_empty(params.season).unwrap_or_else(|| year.to_string()),
            round: non_empty(params.round).unwrap_or_else(|| "1".to_string()),
            detail: non_empty(params.detail),
        }
    }

    /// `season:round:detail`, with an empty detail segment when unset
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.season,
            self.round,
            self.detail.as_deref().unwrap_or("")
        )
    }
}

/// One lap of a driver's session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub lap_number: Option<u32>,
    pub lap_time: Option<String>,
    pub lap_time_seconds: Option<f64>,
}

/// A driver and their laps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLaps {
    pub driver: String,
    pub name: Option<String>,
    pub driver_number: Option<u32>,
    pub laps: Vec<Lap>,
}

/// Payload of the telemetry endpoint
///
/// `raw` is only present when the upstream body had no `drivers` list; it
/// echoes that body so nothing is lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTelemetry {
    pub source: Source,
    pub season: String,
    pub round: String,
    pub drivers: Vec<DriverLaps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// Client for the FastF1 proxy
#[derive(Debug, Clone)]
pub struct FastF1Client {
    client: Client,
    base_url: String,
}

impl Default for FastF1Client {
    fn default() -> Self {
        Self::new()
    }
}

impl FastF1Client {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: FASTF1_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the session document for `query`
    pub async fn fetch_session(&self, query: &SessionQuery) -> Result<Value, UpstreamError> {
        let url = format!("{}/{}", self.base_url, SESSION_PATH);

        let mut params = vec![("season", query.season.as_str()), ("round", query.round.as_str())];
        if let Some(detail) = query.detail.as_deref() {
            params.push(("detail", detail));
        }

        get_json(self.client.get(&url).query(&params)).await
    }
}

/// Proxy policy for per-session telemetry
#[derive(Debug, Clone)]
pub struct TelemetryPolicy {
    client: FastF1Client,
}

impl TelemetryPolicy {
    pub fn new(client: FastF1Client) -> Self {
        Self { client }
    }
}

impl ProxyPolicy for TelemetryPolicy {
    type Params = SessionQuery;
    type Raw = Value;
    type Output = SessionTelemetry;

    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn cache_key(&self, params: &SessionQuery) -> String {
        params.cache_key()
    }

    fn fetch<'a>(&'a self, params: &'a SessionQuery) -> BoxFuture<'a, Result<Value, UpstreamError>> {
        self.client.fetch_session(params).boxed()
    }

    fn shape(&self, params: &SessionQuery, raw: Value) -> SessionTelemetry {
        normalize_session(params, raw)
    }

    fn sample(&self, params: &SessionQuery) -> SessionTelemetry {
        sample_session(params)
    }
}

/// Normalizes either upstream shape into `SessionTelemetry`
///
/// The upstream's own `source` label is kept when present, `fastf1` otherwise.
pub fn normalize_session(query: &SessionQuery, body: Value) -> SessionTelemetry {
    let source = body
        .get("source")
        .and_then(Value::as_str)
        .map(|label| Source::from(label.to_string()))
        .unwrap_or(Source::FastF1);

    let drivers = body
        .get("drivers")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(normalize_driver).collect::<Vec<_>>());

    match drivers {
        Some(drivers) => SessionTelemetry {
            source,
            season: query.season.clone(),
            round: query.round.clone(),
            drivers,
            raw: None,
        },
        None => SessionTelemetry {
            source,
            season: query.season.clone(),
            round: query.round.clone(),
            drivers: Vec::new(),
            raw: Some(body),
        },
    }
}

fn normalize_driver(entry: &Value) -> DriverLaps {
    let driver = entry
        .get("driver")
        .and_then(scalar_to_string)
        .or_else(|| entry.get("driverNumber").and_then(scalar_to_string))
        .unwrap_or_default();

    let laps = match entry.get("laps") {
        Some(Value::Array(laps)) => laps.iter().map(normalize_lap).collect(),
        _ => compact_lap(entry).into_iter().collect(),
    };

    DriverLaps {
        driver,
        name: entry.get("name").and_then(Value::as_str).map(str::to_string),
        driver_number: entry.get("driverNumber").and_then(as_u32),
        laps,
    }
}

/// The single lap a compact entry describes, if any
fn compact_lap(entry: &Value) -> Option<Lap> {
    if let Some(fastest) = entry.get("fastestLap").filter(|v| v.is_object()) {
        return Some(normalize_lap(fastest));
    }

    let has_lap_fields = ["lapNumber", "lapTime", "lapTimeStr", "lapTimeSeconds"]
        .iter()
        .any(|field| entry.get(field).is_some_and(|v| !v.is_null()));

    has_lap_fields.then(|| normalize_lap(entry))
}

fn normalize_lap(lap: &Value) -> Lap {
    let lap_time = lap
        .get("lapTime")
        .and_then(Value::as_str)
        .or_else(|| lap.get("lapTimeStr").and_then(Value::as_str))
        .map(str::to_string);

    Lap {
        lap_number: lap.get("lapNumber").and_then(as_u32),
        lap_time,
        lap_time_seconds: lap.get("lapTimeSeconds").and_then(Value::as_f64),
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
        .and_then(|n| u32::try_from(n).ok())
}

/// Fallback telemetry for `query`: three drivers, three laps each
pub fn sample_session(query: &SessionQuery) -> SessionTelemetry {
    SessionTelemetry {
        source: Source::Sample,
        season: query.season.clone(),
        round: query.round.clone(),
        drivers: vec![
            sample_driver("verstappen", "Max Verstappen", &[("1:20.345", 80.345), ("1:19.876", 79.876), ("1:19.234", 79.234)]),
            sample_driver("hamilton", "Lewis Hamilton", &[("1:21.111", 81.111), ("1:20.789", 80.789), ("1:20.050", 80.05)]),
            sample_driver("norris", "Lando Norris", &[("1:21.500", 81.5), ("1:20.999", 80.999), ("1:20.200", 80.2)]),
        ],
        raw: None,
    }
}

fn sample_driver(driver: &str, name: &str, laps: &[(&str, f64)]) -> DriverLaps {
    DriverLaps {
        driver: driver.to_string(),
        name: Some(name.to_string()),
        driver_number: None,
        laps: laps
            .iter()
            .zip(1u32..)
            .map(|((time, seconds), lap_number)| Lap {
                lap_number: Some(lap_number),
                lap_time: Some(time.to_string()),
                lap_time_seconds: Some(*seconds),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query(detail: Option<&str>) -> SessionQuery {
        SessionQuery {
            season: "2024".to_string(),
            round: "5".to_string(),
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn test_from_params_defaults() {
        let q = SessionQuery::from_params_in_year(SessionParams::default(), 2025);

        assert_eq!(q.season, "2025");
        assert_eq!(q.round, "1");
        assert!(q.detail.is_none());
        assert_eq!(q.cache_key(), "2025:1:");
    }

    #[test]
    fn test_from_params_treats_blank_values_as_missing() {
        let params = SessionParams {
            season: Some("".to_string()),
            round: Some("  ".to_string()),
            detail: Some("".to_string()),
        };
        let q = SessionQuery::from_params_in_year(params, 2025);

        assert_eq!(q.cache_key(), "2025:1:");
    }

    #[test]
    fn test_cache_key_includes_detail() {
        assert_eq!(query(Some("full")).cache_key(), "2024:5:full");
        assert_eq!(query(None).cache_key(), "2024:5:");
    }

    #[test]
    fn test_normalize_compact_shape() {
        let body = json!({
            "source": "fastf1",
            "season": 2024,
            "round": 5,
            "drivers": [
                { "driver": "VER", "lapNumber": 43, "lapTime": "0 days 00:01:32.608000", "lapTimeSeconds": 92.608 },
                { "driver": "NOR", "lapNumber": 51, "lapTime": "0 days 00:01:33.015000", "lapTimeSeconds": 93.015 }
            ]
        });

        let result = normalize_session(&query(None), body);

        assert_eq!(result.source, Source::FastF1);
        assert_eq!(result.season, "2024");
        assert_eq!(result.round, "5");
        assert!(result.raw.is_none());
        assert_eq!(result.drivers.len(), 2);
        assert_eq!(result.drivers[0].driver, "VER");
        assert!(result.drivers[0].name.is_none());
        assert_eq!(
            result.drivers[0].laps,
            vec![Lap {
                lap_number: Some(43),
                lap_time: Some("0 days 00:01:32.608000".to_string()),
                lap_time_seconds: Some(92.608),
            }]
        );
    }

    #[test]
    fn test_normalize_compact_fastest_lap_object() {
        let body = json!({
            "drivers": [
                { "driverNumber": 44, "name": "Lewis Hamilton", "fastestLap": { "lapNumber": 12, "lapTimeStr": "1:21.004" } }
            ]
        });

        let result = normalize_session(&query(None), body);
        let driver = &result.drivers[0];

        assert_eq!(driver.driver, "44");
        assert_eq!(driver.driver_number, Some(44));
        assert_eq!(driver.name.as_deref(), Some("Lewis Hamilton"));
        assert_eq!(driver.laps.len(), 1);
        assert_eq!(driver.laps[0].lap_number, Some(12));
        assert_eq!(driver.laps[0].lap_time.as_deref(), Some("1:21.004"));
        assert!(driver.laps[0].lap_time_seconds.is_none());
    }

    #[test]
    fn test_normalize_full_shape() {
        let body = json!({
            "source": "fastf1",
            "drivers": [
                {
                    "driver": "LEC",
                    "driverNumber": 16,
                    "laps": [
                        { "lapNumber": 1, "lapTimeSeconds": 95.1, "lapTimeStr": "0 days 00:01:35.100000" },
                        { "lapNumber": 2, "lapTimeSeconds": null, "lapTimeStr": "NaT" }
                    ]
                }
            ]
        });

        let result = normalize_session(&query(Some("full")), body);
        let driver = &result.drivers[0];

        assert_eq!(driver.driver, "LEC");
        assert_eq!(driver.driver_number, Some(16));
        assert_eq!(driver.laps.len(), 2);
        assert_eq!(driver.laps[0].lap_time.as_deref(), Some("0 days 00:01:35.100000"));
        assert_eq!(driver.laps[0].lap_time_seconds, Some(95.1));
        assert_eq!(driver.laps[1].lap_number, Some(2));
        assert!(driver.laps[1].lap_time_seconds.is_none());
    }

    #[test]
    fn test_compact_and_full_shapes_serialize_alike() {
        let compact = normalize_session(
            &query(None),
            json!({ "drivers": [ { "driver": "VER", "lapNumber": 3, "lapTime": "1:19.2", "lapTimeSeconds": 79.2 } ] }),
        );
        let full = normalize_session(
            &query(Some("full")),
            json!({ "drivers": [ { "driver": "VER", "laps": [ { "lapNumber": 3, "lapTimeStr": "1:19.2", "lapTimeSeconds": 79.2 } ] } ] }),
        );

        assert_eq!(compact.drivers, full.drivers);
    }

    #[test]
    fn test_normalize_entry_without_lap_information() {
        let body = json!({ "drivers": [ { "driver": "SAR" }, "not an object", { "laps": "garbage" } ] });

        let result = normalize_session(&query(None), body);

        assert_eq!(result.drivers.len(), 3);
        for driver in &result.drivers {
            assert!(driver.laps.is_empty());
        }
        assert_eq!(result.drivers[0].driver, "SAR");
        assert_eq!(result.drivers[1].driver, "");
        assert!(result.drivers[1].name.is_none());
        assert!(result.drivers[1].driver_number.is_none());
    }

    #[test]
    fn test_normalize_without_drivers_keeps_raw_body() {
        let body = json!({ "source": "fastf1-cache", "status": "loading" });

        let result = normalize_session(&query(None), body.clone());

        assert_eq!(result.source, Source::Other("fastf1-cache".to_string()));
        assert!(result.drivers.is_empty());
        assert_eq!(result.raw, Some(body));
    }

    #[test]
    fn test_raw_is_omitted_from_json_when_absent() {
        let json = serde_json::to_value(sample_session(&query(None))).unwrap();
        assert!(json.get("raw").is_none());
        assert_eq!(json["drivers"][0]["laps"][0]["lapNumber"], 1);
    }

    #[test]
    fn test_sample_echoes_requested_session() {
        let sample = sample_session(&query(Some("full")));

        assert_eq!(sample.source, Source::Sample);
        assert_eq!(sample.season, "2024");
        assert_eq!(sample.round, "5");
        assert_eq!(sample.drivers.len(), 3);
        assert_eq!(sample.drivers[0].laps[2].lap_time.as_deref(), Some("1:19.234"));
    }

    #[test]
    fn test_as_u32() {
        assert_eq!(as_u32(&json!(12)), Some(12));
        assert_eq!(as_u32(&json!(12.0)), Some(12));
        assert_eq!(as_u32(&json!(12.5)), None);
        assert_eq!(as_u32(&json!(-1)), None);
        assert_eq!(as_u32(&json!("12")), None);
    }

    #[tokio::test]
    async fn test_fetch_session_forwards_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/telemetry/session"))
            .and(query_param("season", "2024"))
            .and(query_param("round", "5"))
            .and(query_param("detail", "full"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "drivers": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = FastF1Client::new().with_base_url(server.uri());
        let body = client
            .fetch_session(&query(Some("full")))
            .await
            .expect("Fetch should succeed");

        assert_eq!(body, json!({ "drivers": [] }));
    }
}

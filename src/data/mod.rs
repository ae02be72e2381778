//! Upstream clients and proxy policies
//!
//! One submodule per dashboard endpoint. Each defines the caller-facing
//! payload, its sample, and a `ProxyPolicy` wiring them to an upstream client.
//! Payload field names follow the provider's JSON (`circuitId`, `Location`,
//! `Driver`, ...) so the dashboard can read live and sample data the same way.

pub mod circuits;
pub mod drivers;
pub mod ergast;
pub mod standings;
pub mod telemetry;

pub use circuits::{CircuitsPolicy, CircuitsResponse};
pub use drivers::{DriversPolicy, DriversResponse};
pub use ergast::ErgastClient;
pub use standings::{StandingsPolicy, StandingsResponse};
pub use telemetry::{FastF1Client, SessionQuery, SessionTelemetry, TelemetryPolicy};

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::UpstreamError;

/// Connect timeout for upstream HTTP clients
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Provenance tag carried by every payload as `source`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    /// Live data from the Ergast-style statistics API
    Ergast,
    /// Live data from the FastF1 telemetry proxy
    FastF1,
    /// Hardcoded fallback payload
    Sample,
    /// Label reported by an upstream that we pass through as-is
    Other(String),
}

impl Source {
    pub fn as_str(&self) -> &str {
        match self {
            Source::Ergast => "ergast",
            Source::FastF1 => "fastf1",
            Source::Sample => "sample",
            Source::Other(label) => label,
        }
    }

    pub fn is_sample(&self) -> bool {
        matches!(self, Source::Sample)
    }
}

impl From<String> for Source {
    fn from(label: String) -> Self {
        match label.as_str() {
            "ergast" => Source::Ergast,
            "fastf1" => Source::FastF1,
            "sample" => Source::Sample,
            _ => Source::Other(label),
        }
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        match source {
            Source::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

/// Builds the HTTP client shared by a provider's requests
pub fn build_http_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()
}

/// Sends `request` and parses the body as JSON
///
/// # Returns
/// * `Ok(Value)` - Parsed body of a 2xx response
/// * `Err(UpstreamError)` - Transport failure, non-success status, or malformed JSON
pub(crate) async fn get_json(request: RequestBuilder) -> Result<Value, UpstreamError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status {
            url: response.url().to_string(),
            status,
        });
    }

    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Extracts the list at `pointer`, keeping the elements that parse as `T`
///
/// A missing or non-array value yields an empty list. Elements that don't
/// deserialize are skipped.
pub(crate) fn extract_list<T: DeserializeOwned>(body: &Value, pointer: &str) -> Vec<T> {
    let Some(items) = body.pointer(pointer).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(pointer, error = %e, "skipping malformed upstream record");
                None
            }
        })
        .collect()
}

/// Reads a string or number at `pointer` as a string
pub(crate) fn extract_text(body: &Value, pointer: &str) -> Option<String> {
    body.pointer(pointer).and_then(scalar_to_string)
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads an optional text field that upstreams sometimes send as a number
///
/// Any other JSON type reads as `None` instead of failing the whole record.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

/// Like `lenient_string`, for identifiers that default to an empty string
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

/// Reads a nested record, dropping just that field when it doesn't parse
pub(crate) fn lenient_record<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| T::deserialize(v).ok()))
}

/// Reads a nested list, skipping elements that don't parse
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|item| T::deserialize(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

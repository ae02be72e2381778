//! Ergast API client
//!
//! Fetches JSON documents from an Ergast-compatible motorsport statistics API.
//! Every response is wrapped in an `MRData` envelope; extracting records from
//! it is left to the endpoint modules.

use reqwest::Client;
use serde_json::Value;

use super::get_json;
use crate::error::UpstreamError;

/// Base URL for the Ergast API
pub const ERGAST_BASE_URL: &str = "https://ergast.com/api/f1";

/// Client for fetching documents from the Ergast API
#[derive(Debug, Clone)]
pub struct ErgastClient {
    client: Client,
    base_url: String,
}

impl Default for ErgastClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ErgastClient {
    /// Create a new ErgastClient with default settings
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a new ErgastClient with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: ERGAST_BASE_URL.to_string(),
        }
    }

    /// Points the client at a different Ergast-compatible host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the document at `path` (e.g. `current/drivers.json`)
    ///
    /// # Returns
    /// * `Ok(Value)` - The parsed JSON body
    /// * `Err(UpstreamError)` - If the request fails, the status is not 2xx,
    ///   or the body is not JSON
    pub async fn fetch_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        get_json(self.client.get(&url).query(query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ergast_client_default() {
        let client = ErgastClient::default();
        assert_eq!(client.base_url(), ERGAST_BASE_URL);
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let client = ErgastClient::new().with_base_url("http://localhost:8000/api/f1/");
        assert_eq!(client.base_url(), "http://localhost:8000/api/f1");
    }

    #[tokio::test]
    async fn test_fetch_json_returns_body_with_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/circuits.json"))
            .and(query_param("limit", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "MRData": { "total": "77" } })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ErgastClient::new().with_base_url(server.uri());
        let body = client
            .fetch_json("circuits.json", &[("limit", "1000")])
            .await
            .expect("Fetch should succeed");

        assert_eq!(body["MRData"]["total"], "77");
    }

    #[tokio::test]
    async fn test_fetch_json_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ErgastClient::new().with_base_url(server.uri());
        let result = client.fetch_json("current/drivers.json", &[]).await;

        match result {
            Err(UpstreamError::Status { status, url }) => {
                assert_eq!(status.as_u16(), 503);
                assert!(url.ends_with("/current/drivers.json"));
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_json_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = ErgastClient::new().with_base_url(server.uri());
        let result = client.fetch_json("current/drivers.json", &[]).await;

        assert!(matches!(result, Err(UpstreamError::Parse(_))));
    }
}

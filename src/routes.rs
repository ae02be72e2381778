//! HTTP handlers
//!
//! Every data handler answers 200 with a JSON body. Upstream trouble shows up
//! as `"source": "sample"` in the body and `x-cache: fallback` in the headers,
//! never as an error status.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderName,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::data::telemetry::{SessionParams, SessionQuery};
use crate::error::AppError;
use crate::proxy::Resolution;
use crate::state::AppState;

/// Response header reporting hit, miss or fallback
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache");

pub async fn circuits_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    proxy_response(state.circuits.resolve(&()).await)
}

pub async fn drivers_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    proxy_response(state.drivers.resolve(&()).await)
}

pub async fn standings_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    proxy_response(state.standings.resolve(&()).await)
}

/// `GET /api/fastf1/session?season=&round=&detail=`
pub async fn telemetry_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionParams>,
) -> Result<Response, AppError> {
    let query = SessionQuery::from_params(params);
    proxy_response(state.telemetry.resolve(&query).await)
}

pub async fn health_handler() -> &'static str {
    "ok"
}

fn proxy_response<T: Serialize>(resolution: Resolution<T>) -> Result<Response, AppError> {
    let body = serde_json::to_value(&resolution.payload)?;
    Ok((
        [(CACHE_STATUS_HEADER, resolution.status.as_str())],
        Json(body),
    )
        .into_response())
}

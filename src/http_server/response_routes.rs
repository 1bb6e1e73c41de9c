//! Response HTTP Routes
//!
//! Submission intake and the analytics summary.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::errors::ApiError;
use super::state::AppState;
use crate::aggregate::Summary;
use crate::ingest::{RequestMeta, Submission};

/// Body returned for an accepted submission
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub id: String,
    pub submitted_at: DateTime<Utc>,
}

/// Create response routes
pub fn response_routes(state: AppState) -> Router {
    Router::new()
        .route("/responses", post(submit_handler))
        .route("/analytics/:form_id/summary", get(summary_handler))
        .with_state(state)
}

/// Client address: first `X-Forwarded-For` hop, else the socket peer
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(hop) => Some(
            hop.parse::<IpAddr>()
                .map(|ip| ip.to_string())
                .unwrap_or_else(|_| hop.to_string()),
        ),
        None => peer.map(|addr| addr.ip().to_string()),
    }
}

fn request_meta(headers: &HeaderMap, peer: Option<SocketAddr>) -> RequestMeta {
    RequestMeta {
        ip: client_ip(headers, peer),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

async fn submit_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<Submission>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(submission) = body?;
    let meta = request_meta(&headers, peer.map(|ConnectInfo(addr)| addr));

    let ingestor = state.ingestor.clone();
    let receipt = tokio::task::spawn_blocking(move || ingestor.submit(submission, meta)).await??;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            id: receipt.response.id,
            submitted_at: receipt.response.submitted_at,
        }),
    ))
}

async fn summary_handler(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> Result<Json<Summary>, ApiError> {
    let aggregator = state.aggregator.clone();
    let summary = tokio::task::spawn_blocking(move || aggregator.summarize(&form_id)).await??;
    Ok(Json(summary))
}

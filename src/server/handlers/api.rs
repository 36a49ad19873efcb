//! Read-only API endpoint handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::super::AppState;
use crate::models::{ClaimedRequest, RequestStatus};

/// Default and maximum number of requests listed.
const RECENT_LIMIT: i64 = 100;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Parameters for recent requests.
#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<i64>,
}

/// One row of the recent request listing.
#[derive(Debug, Serialize)]
struct RequestSummary {
    id: i32,
    group: i32,
    website: String,
    browser: String,
    major: Option<i32>,
    minor: Option<i32>,
    platform: Option<String>,
    priority: i32,
    status: RequestStatus,
    factory: Option<i32>,
    locked_at: Option<String>,
    fulfilled_at: Option<String>,
    submitted: String,
    expire: String,
}

impl RequestSummary {
    fn new(item: ClaimedRequest, status: RequestStatus) -> Self {
        let ClaimedRequest { request, group } = item;
        Self {
            id: request.id,
            group: group.id,
            website: group.website,
            browser: request.browser_group,
            major: request.major,
            minor: request.minor,
            platform: request.platform,
            priority: request.priority,
            status,
            factory: request.claim.map(|c| c.factory_id),
            locked_at: request.claim.map(|c| c.locked_at.to_rfc3339()),
            fulfilled_at: request.fulfilled_at.map(|t| t.to_rfc3339()),
            submitted: group.submitted.to_rfc3339(),
            expire: group.expire.to_rfc3339(),
        }
    }
}

/// API endpoint listing the newest requests with their status.
pub async fn api_requests(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(RECENT_LIMIT).clamp(1, RECENT_LIMIT);
    let now = Utc::now();

    match state.requests.recent(limit).await {
        Ok(items) => {
            let rows: Vec<RequestSummary> = items
                .into_iter()
                .map(|item| {
                    let status = item.request.status(&item.group, now, state.lease);
                    RequestSummary::new(item, status)
                })
                .collect();
            axum::Json(rows).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// API endpoint listing factories that have polled, most recent first.
pub async fn api_factories(State(state): State<AppState>) -> impl IntoResponse {
    match state.factories.list_active().await {
        Ok(factories) => axum::Json(factories).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// API endpoint with queue counters.
pub async fn api_queue(State(state): State<AppState>) -> impl IntoResponse {
    match state.requests.stats(Utc::now(), state.lease).await {
        Ok(stats) => axum::Json(stats).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

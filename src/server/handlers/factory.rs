//! Factory protocol handlers: poll for work and report fulfillment.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::super::AppState;
use crate::services::PollError;

/// Credentials sent with every factory call.
#[derive(Debug, Deserialize)]
pub struct FactoryCredentials {
    pub factory: String,
    #[serde(default)]
    pub credential: String,
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let status = match &self {
            PollError::Unauthorized | PollError::UnknownFactory(_) => StatusCode::UNAUTHORIZED,
            PollError::NoMatchingRequest | PollError::RequestNotFound(_) => StatusCode::NOT_FOUND,
            PollError::NoMatchingBrowser { .. } | PollError::ClaimInvalid(_) => {
                StatusCode::CONFLICT
            }
            PollError::Queue(_) | PollError::Database(_) => {
                tracing::error!("Factory request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({
            "fault": self.fault_code(),
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Claim the next matching request for a factory.
pub async fn poll(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(creds): Json<FactoryCredentials>,
) -> Result<impl IntoResponse, PollError> {
    let source = peer.map(|ConnectInfo(addr)| addr.ip().to_string());
    let assignment = state
        .poll
        .poll(&creds.factory, &creds.credential, source.as_deref(), Utc::now())
        .await?;
    Ok(Json(assignment))
}

/// Mark a claimed request as fulfilled.
pub async fn fulfill(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(creds): Json<FactoryCredentials>,
) -> Result<impl IntoResponse, PollError> {
    state
        .poll
        .fulfill(&creds.factory, &creds.credential, id, Utc::now())
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

//! HTTP client a factory uses to talk to a shotqueue server.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::Assignment;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Server fault {fault} ({error}): {message}")]
    Fault {
        fault: u16,
        error: String,
        message: String,
    },
    #[error("Unexpected response: {0}")]
    Parse(String),
}

impl ClientError {
    /// True when the server simply had nothing for this factory.
    pub fn is_no_work(&self) -> bool {
        matches!(self, Self::Fault { error, .. } if error == "no_matching_request")
    }
}

#[derive(Debug, Deserialize)]
struct FaultBody {
    fault: u16,
    error: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    factory: &'a str,
    credential: &'a str,
}

/// Lowercase host name, used as the factory name when none is given.
pub fn default_factory_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.to_lowercase())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "factory".to_string())
}

/// Client for the factory endpoints of the HTTP API.
pub struct FactoryClient {
    base_url: String,
    client: Client,
}

impl FactoryClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server for the next screenshot job.
    pub async fn poll(&self, factory: &str, credential: &str) -> Result<Assignment, ClientError> {
        let url = format!("{}/api/poll", self.base_url);
        debug!("Polling {} as {}", url, factory);
        let resp = self
            .client
            .post(&url)
            .json(&Credentials { factory, credential })
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::fault(resp).await);
        }

        resp.json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Report a claimed request as fulfilled.
    pub async fn fulfill(
        &self,
        factory: &str,
        credential: &str,
        request_id: i32,
    ) -> Result<(), ClientError> {
        let url = format!("{}/api/requests/{}/fulfill", self.base_url, request_id);
        let resp = self
            .client
            .post(&url)
            .json(&Credentials { factory, credential })
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::fault(resp).await);
        }
        Ok(())
    }

    async fn fault(resp: reqwest::Response) -> ClientError {
        let status = resp.status();
        match resp.json::<FaultBody>().await {
            Ok(body) => ClientError::Fault {
                fault: body.fault,
                error: body.error,
                message: body.message,
            },
            Err(_) => ClientError::Parse(format!("HTTP {}", status)),
        }
    }
}

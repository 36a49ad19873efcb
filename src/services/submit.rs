//! Request submission.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::models::{NewRequestGroup, Request, RequestGroup};
use crate::repository::{DbContext, DieselPriorityRepository, DieselRequestRepository};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid website URL '{0}': {1}")]
    InvalidUrl(String, String),
    #[error("At least one browser is required")]
    NoBrowsers,
    #[error("Expiry must be in the future")]
    AlreadyExpired,
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Validates submissions and assigns their priority.
#[derive(Clone)]
pub struct SubmitService {
    requests: DieselRequestRepository,
    priorities: DieselPriorityRepository,
    default_priority: i32,
}

impl SubmitService {
    pub fn new(ctx: &DbContext, default_priority: i32) -> Self {
        Self {
            requests: ctx.requests(),
            priorities: ctx.priorities(),
            default_priority,
        }
    }

    /// Queue a screenshot request group.
    ///
    /// The priority is the highest live domain priority covering the
    /// website's host, or the default. It is fixed at submission.
    pub async fn submit(
        &self,
        submission: &NewRequestGroup,
        now: DateTime<Utc>,
    ) -> Result<(RequestGroup, Vec<Request>), SubmitError> {
        let url = url::Url::parse(&submission.website)
            .map_err(|e| SubmitError::InvalidUrl(submission.website.clone(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SubmitError::InvalidUrl(
                submission.website.clone(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        let host = url.host_str().ok_or_else(|| {
            SubmitError::InvalidUrl(submission.website.clone(), "missing host".to_string())
        })?;
        if submission.browsers.is_empty() {
            return Err(SubmitError::NoBrowsers);
        }
        if submission.expire <= now {
            return Err(SubmitError::AlreadyExpired);
        }

        let priority = self
            .priorities
            .priority_for_host(host, now)
            .await?
            .unwrap_or(self.default_priority);

        let (group, requests) = self.requests.submit(submission, priority, now).await?;
        info!(
            "Submitted {} with {} requests at priority {}",
            group.website,
            requests.len(),
            priority
        );
        Ok((group, requests))
    }
}

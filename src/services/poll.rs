//! Poll and fulfill orchestration for factories.
//!
//! A poll authenticates the factory, records that it was seen, builds its
//! capability filter, claims one request from the queue and resolves the
//! concrete browser, screen size and color depth to use.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{AuthError, CredentialVerifier};
use crate::matching::{resolve_browser, resolve_color_depth, resolve_screen_size, CapabilityFilter};
use crate::models::{Assignment, Factory, Plugin, RequestGroup};
use crate::repository::{DbContext, DieselFactoryRepository, DieselRequestRepository};
use crate::work_queue::{WorkQueue, WorkQueueError};

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Unknown factory: {0}")]
    UnknownFactory(String),
    #[error("No matching request")]
    NoMatchingRequest,
    #[error("No matching browser for selected request {request_id}")]
    NoMatchingBrowser { request_id: i32 },
    #[error("Claim on request {0} is not held or has expired")]
    ClaimInvalid(i32),
    #[error("Request not found: {0}")]
    RequestNotFound(i32),
    #[error("Queue error: {0}")]
    Queue(WorkQueueError),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl PollError {
    /// Numeric fault code reported to factories.
    pub fn fault_code(&self) -> u16 {
        match self {
            Self::Unauthorized | Self::UnknownFactory(_) => 401,
            Self::NoMatchingRequest => 204,
            Self::NoMatchingBrowser { .. } => 404,
            Self::RequestNotFound(_) => 404,
            Self::ClaimInvalid(_) => 409,
            Self::Queue(_) | Self::Database(_) => 500,
        }
    }

    /// Stable machine-readable name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized | Self::UnknownFactory(_) => "unauthorized",
            Self::NoMatchingRequest => "no_matching_request",
            Self::NoMatchingBrowser { .. } => "no_matching_browser",
            Self::ClaimInvalid(_) => "claim_invalid",
            Self::RequestNotFound(_) => "request_not_found",
            Self::Queue(_) | Self::Database(_) => "internal",
        }
    }
}

impl From<AuthError> for PollError {
    fn from(_: AuthError) -> Self {
        Self::Unauthorized
    }
}

impl From<WorkQueueError> for PollError {
    fn from(e: WorkQueueError) -> Self {
        match e {
            WorkQueueError::NotFound(_) => Self::NoMatchingRequest,
            WorkQueueError::ClaimInvalid(id) => Self::ClaimInvalid(id),
            WorkQueueError::Database(e) => Self::Database(e),
            other => Self::Queue(other),
        }
    }
}

/// Service handling factory polls and uploads.
#[derive(Clone)]
pub struct PollService {
    factories: DieselFactoryRepository,
    requests: DieselRequestRepository,
    queue: Arc<dyn WorkQueue>,
    verifier: Arc<dyn CredentialVerifier>,
    release_on_browser_mismatch: bool,
}

impl PollService {
    pub fn new(
        ctx: &DbContext,
        queue: Arc<dyn WorkQueue>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            factories: ctx.factories(),
            requests: ctx.requests(),
            queue,
            verifier,
            release_on_browser_mismatch: false,
        }
    }

    /// Release the claim instead of leaving it to expire when no browser matches.
    pub fn with_release_on_browser_mismatch(mut self, release: bool) -> Self {
        self.release_on_browser_mismatch = release;
        self
    }

    async fn authenticate(&self, name: &str, credential: &str) -> Result<Factory, PollError> {
        let factory = self
            .factories
            .get_by_name(name)
            .await?
            .ok_or_else(|| PollError::UnknownFactory(name.to_string()))?;
        self.verifier.verify(&factory, credential).await?;
        Ok(factory)
    }

    /// Claim and resolve one unit of work for the named factory.
    pub async fn poll(
        &self,
        name: &str,
        credential: &str,
        source_addr: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Assignment, PollError> {
        let factory = self.authenticate(name, credential).await?;
        self.factories.touch_poll(factory.id, source_addr, now).await?;

        let inventory = self
            .factories
            .get_inventory(factory.id)
            .await?
            .ok_or_else(|| PollError::UnknownFactory(name.to_string()))?;
        let filter = CapabilityFilter::for_inventory(&inventory);

        let claimed = self.queue.find_and_claim(&filter, factory.id, now).await?;
        let (request, group) = (&claimed.request, &claimed.group);

        let Some(browser) = resolve_browser(&inventory, request, group) else {
            if self.release_on_browser_mismatch {
                self.queue.release(request.id, factory.id).await?;
                warn!(
                    "No matching browser on factory {} for request {}; claim released",
                    factory.name, request.id
                );
            } else {
                warn!(
                    "No matching browser on factory {} for request {}; claim held until lease expires",
                    factory.name, request.id
                );
            }
            return Err(PollError::NoMatchingBrowser {
                request_id: request.id,
            });
        };

        let size = resolve_screen_size(&inventory, group);
        let depth = resolve_color_depth(&inventory, group);

        info!(
            "Assigned request {} ({}) to factory {}: {} {}, {} at {}bpp",
            request.id, group.website, factory.name, browser.browser_group, browser.version, size,
            depth.bits_per_pixel
        );

        Ok(Assignment {
            request: request.id,
            browser: browser.browser_group.clone(),
            version: browser.version.clone(),
            major: browser.major,
            minor: browser.minor,
            command: browser.command.clone(),
            width: size.width,
            height: size.height,
            bpp: depth.bits_per_pixel,
            javascript: self.plugin_label(group, Plugin::Javascript).await?,
            java: self.plugin_label(group, Plugin::Java).await?,
            flash: self.plugin_label(group, Plugin::Flash).await?,
        })
    }

    /// Requested version label for a plugin, empty when unconstrained.
    async fn plugin_label(&self, group: &RequestGroup, plugin: Plugin) -> Result<String, PollError> {
        let Some(id) = group.plugin(plugin) else {
            return Ok(String::new());
        };
        Ok(self
            .requests
            .plugin_label(plugin, id)
            .await?
            .unwrap_or_else(|| id.to_string()))
    }

    /// Mark a request the factory holds as fulfilled.
    pub async fn fulfill(
        &self,
        name: &str,
        credential: &str,
        request_id: i32,
        now: DateTime<Utc>,
    ) -> Result<(), PollError> {
        let factory = self.authenticate(name, credential).await?;

        match self.queue.fulfill(request_id, factory.id, now).await {
            Ok(()) => {}
            Err(WorkQueueError::NotFound(_)) => return Err(PollError::RequestNotFound(request_id)),
            Err(e) => return Err(e.into()),
        }

        self.factories.touch_upload(factory.id, now).await?;
        Ok(())
    }
}

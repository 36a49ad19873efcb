//! Work queue abstraction for the claim/fulfill lifecycle.
//!
//! A factory finds the best request it is able to serve and claims it in
//! one call. Claims are soft leases: a claim older than the queue's lease
//! is treated as absent, and its holder can no longer fulfill it.

mod db;
mod error;

pub use db::DbWorkQueue;
pub use error::WorkQueueError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::matching::CapabilityFilter;
use crate::models::ClaimedRequest;

/// Message carried by `WorkQueueError::NotFound` when nothing matches.
pub const NO_MATCHING_REQUEST: &str = "No matching request";

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Select the best request `filter` accepts and claim it for `factory_id`.
    ///
    /// Candidates are unfulfilled, belong to an unexpired group and are
    /// unclaimed or stale, ordered by priority descending, then submission
    /// time, then id. Fails with `NotFound` when there is no candidate or
    /// the claim is lost to another factory twice in a row.
    async fn find_and_claim(
        &self,
        filter: &CapabilityFilter,
        factory_id: i32,
        now: DateTime<Utc>,
    ) -> Result<ClaimedRequest, WorkQueueError>;

    /// Permanently complete a request. Requires a live claim by `factory_id`.
    async fn fulfill(
        &self,
        request_id: i32,
        factory_id: i32,
        now: DateTime<Utc>,
    ) -> Result<(), WorkQueueError>;

    /// Give up `factory_id`'s claim so the request is claimable at once.
    async fn release(&self, request_id: i32, factory_id: i32) -> Result<bool, WorkQueueError>;

    /// Clear stale claims. Selection already ignores them; this is cleanup.
    async fn release_stale_claims(&self, now: DateTime<Utc>) -> Result<usize, WorkQueueError>;
}
